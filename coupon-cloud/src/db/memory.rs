//! In-memory store with the same semantics as [`super::PgStore`]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Coupon, CouponCreate, NewOrder, Order, OrderStatus, OrderSummary, UserCoupon, UserCouponView,
};
use tokio::sync::RwLock;

use super::{CouponRepository, OrderRepository, StoreError, StoreResult, UserCouponRepository};
use crate::util::now_millis;

#[derive(Default)]
struct Tables {
    coupons: BTreeMap<i64, Coupon>,
    orders: BTreeMap<i64, Order>,
    user_coupons: BTreeMap<i64, UserCoupon>,
    last_coupon_id: i64,
    last_order_id: i64,
    last_user_coupon_id: i64,
}

/// A thread-safe in-memory store.
///
/// All three tables sit behind one `RwLock`, so every operation is atomic
/// the way a single SQL statement is.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change a coupon's price; returns `false` for an unknown id
    pub async fn set_coupon_price(&self, id: i64, price: Decimal) -> bool {
        let mut tables = self.tables.write().await;
        match tables.coupons.get_mut(&id) {
            Some(coupon) => {
                coupon.price = price;
                coupon.updated_at = now_millis();
                true
            }
            None => false,
        }
    }

    /// Toggle a coupon's active flag; returns `false` for an unknown id
    pub async fn set_coupon_active(&self, id: i64, is_active: bool) -> bool {
        let mut tables = self.tables.write().await;
        match tables.coupons.get_mut(&id) {
            Some(coupon) => {
                coupon.is_active = is_active;
                coupon.updated_at = now_millis();
                true
            }
            None => false,
        }
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    pub async fn user_coupon_count(&self) -> usize {
        self.tables.read().await.user_coupons.len()
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn create_coupon(&self, coupon: &CouponCreate) -> StoreResult<Coupon> {
        let mut tables = self.tables.write().await;
        tables.last_coupon_id += 1;
        let now = now_millis();
        let row = Coupon {
            id: tables.last_coupon_id,
            name: coupon.name.clone(),
            description: coupon.description.clone(),
            price: coupon.price,
            currency: coupon.currency.clone(),
            is_active: coupon.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.coupons.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_coupon(&self, id: i64) -> StoreResult<Option<Coupon>> {
        Ok(self.tables.read().await.coupons.get(&id).cloned())
    }

    async fn find_active_coupon(&self, id: i64) -> StoreResult<Option<Coupon>> {
        let tables = self.tables.read().await;
        Ok(tables.coupons.get(&id).filter(|c| c.is_active).cloned())
    }

    async fn list_active_coupons(&self) -> StoreResult<Vec<Coupon>> {
        let tables = self.tables.read().await;
        let mut list: Vec<Coupon> = tables
            .coupons
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        list.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(list)
    }

    async fn count_coupons(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.coupons.len() as i64)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        if tables
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::Conflict("order number already exists".into()));
        }
        tables.last_order_id += 1;
        let now = now_millis();
        let row = Order {
            id: tables.last_order_id,
            order_number: order.order_number.clone(),
            external_order_id: None,
            coupon_id: order.coupon_id,
            user_id: order.user_id.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            status: OrderStatus::Created,
            payment_url: None,
            return_url: order.return_url.clone(),
            fail_url: order.fail_url.clone(),
            description: order.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn find_order_by_external_id(
        &self,
        external_order_id: &str,
    ) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .find(|o| o.external_order_id.as_deref() == Some(external_order_id))
            .cloned())
    }

    async fn transition_order_status(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(&order_id) {
            Some(order) if order.status == from => {
                order.status = to;
                order.updated_at = now_millis();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_order_external_id(
        &self,
        order_id: i64,
        external_order_id: &str,
        payment_url: &str,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::NotFound("order"))?;
        order.external_order_id = Some(external_order_id.to_string());
        order.payment_url = Some(payment_url.to_string());
        order.updated_at = now_millis();
        Ok(())
    }

    async fn list_user_orders(&self, user_id: &str) -> StoreResult<Vec<OrderSummary>> {
        let tables = self.tables.read().await;
        let mut list: Vec<OrderSummary> = tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .map(|o| OrderSummary {
                order: o.clone(),
                coupon_name: tables.coupons.get(&o.coupon_id).map(|c| c.name.clone()),
            })
            .collect();
        list.sort_by(|a, b| (b.order.created_at, b.order.id).cmp(&(a.order.created_at, a.order.id)));
        Ok(list)
    }
}

#[async_trait]
impl UserCouponRepository for MemoryStore {
    async fn activate_user_coupon(
        &self,
        user_id: &str,
        coupon_id: i64,
        order_id: i64,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.user_coupons.values().any(|uc| uc.order_id == order_id) {
            return Ok(false);
        }
        tables.last_user_coupon_id += 1;
        let row = UserCoupon {
            id: tables.last_user_coupon_id,
            user_id: user_id.to_string(),
            coupon_id,
            order_id,
            activated_at: now_millis(),
            is_used: false,
            used_at: None,
        };
        tables.user_coupons.insert(row.id, row);
        Ok(true)
    }

    async fn find_user_coupon_by_order(&self, order_id: i64) -> StoreResult<Option<UserCoupon>> {
        let tables = self.tables.read().await;
        Ok(tables
            .user_coupons
            .values()
            .find(|uc| uc.order_id == order_id)
            .cloned())
    }

    async fn list_user_coupons(&self, user_id: &str) -> StoreResult<Vec<UserCouponView>> {
        let tables = self.tables.read().await;
        let mut list: Vec<UserCouponView> = tables
            .user_coupons
            .values()
            .filter(|uc| uc.user_id == user_id)
            .map(|uc| UserCouponView {
                user_coupon: uc.clone(),
                coupon_name: tables.coupons.get(&uc.coupon_id).map(|c| c.name.clone()),
                order_number: tables.orders.get(&uc.order_id).map(|o| o.order_number.clone()),
            })
            .collect();
        list.sort_by(|a, b| {
            (b.user_coupon.activated_at, b.user_coupon.id)
                .cmp(&(a.user_coupon.activated_at, a.user_coupon.id))
        });
        Ok(list)
    }

    async fn mark_user_coupon_used(&self, user_id: &str, id: i64) -> StoreResult<UserCoupon> {
        let mut tables = self.tables.write().await;
        let uc = tables
            .user_coupons
            .get_mut(&id)
            .filter(|uc| uc.user_id == user_id)
            .ok_or(StoreError::NotFound("user coupon"))?;
        if uc.is_used {
            return Err(StoreError::Conflict("user coupon already used".into()));
        }
        uc.is_used = true;
        uc.used_at = Some(now_millis());
        Ok(uc.clone())
    }
}
