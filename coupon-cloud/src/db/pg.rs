//! PostgreSQL-backed store

use async_trait::async_trait;
use shared::models::{
    Coupon, CouponCreate, NewOrder, Order, OrderStatus, OrderSummary, UserCoupon, UserCouponView,
};
use sqlx::PgPool;

use super::{
    CouponRepository, OrderRepository, StoreError, StoreResult, UserCouponRepository, coupons,
    orders, user_coupons,
};
use crate::util::now_millis;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply the embedded migrations
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl CouponRepository for PgStore {
    async fn create_coupon(&self, coupon: &CouponCreate) -> StoreResult<Coupon> {
        coupons::create(&self.pool, coupon, now_millis())
            .await
            .map_err(|e| StoreError::from_insert(e, "coupon"))
    }

    async fn find_coupon(&self, id: i64) -> StoreResult<Option<Coupon>> {
        Ok(coupons::find_by_id(&self.pool, id).await?)
    }

    async fn find_active_coupon(&self, id: i64) -> StoreResult<Option<Coupon>> {
        Ok(coupons::find_active(&self.pool, id).await?)
    }

    async fn list_active_coupons(&self) -> StoreResult<Vec<Coupon>> {
        Ok(coupons::list_active(&self.pool).await?)
    }

    async fn count_coupons(&self) -> StoreResult<i64> {
        Ok(coupons::count(&self.pool).await?)
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order> {
        orders::create(&self.pool, order, now_millis())
            .await
            .map_err(|e| StoreError::from_insert(e, "order number"))
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        Ok(orders::find_by_number(&self.pool, order_number).await?)
    }

    async fn find_order_by_external_id(
        &self,
        external_order_id: &str,
    ) -> StoreResult<Option<Order>> {
        Ok(orders::find_by_external_id(&self.pool, external_order_id).await?)
    }

    async fn transition_order_status(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool> {
        Ok(orders::transition_status(&self.pool, order_id, from, to, now_millis()).await?)
    }

    async fn set_order_external_id(
        &self,
        order_id: i64,
        external_order_id: &str,
        payment_url: &str,
    ) -> StoreResult<()> {
        let updated = orders::set_external_id(
            &self.pool,
            order_id,
            external_order_id,
            payment_url,
            now_millis(),
        )
        .await?;
        if updated {
            Ok(())
        } else {
            Err(StoreError::NotFound("order"))
        }
    }

    async fn list_user_orders(&self, user_id: &str) -> StoreResult<Vec<OrderSummary>> {
        Ok(orders::list_by_user(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl UserCouponRepository for PgStore {
    async fn activate_user_coupon(
        &self,
        user_id: &str,
        coupon_id: i64,
        order_id: i64,
    ) -> StoreResult<bool> {
        Ok(user_coupons::activate(&self.pool, user_id, coupon_id, order_id, now_millis()).await?)
    }

    async fn find_user_coupon_by_order(&self, order_id: i64) -> StoreResult<Option<UserCoupon>> {
        Ok(user_coupons::find_by_order(&self.pool, order_id).await?)
    }

    async fn list_user_coupons(&self, user_id: &str) -> StoreResult<Vec<UserCouponView>> {
        Ok(user_coupons::list_by_user(&self.pool, user_id).await?)
    }

    async fn mark_user_coupon_used(&self, user_id: &str, id: i64) -> StoreResult<UserCoupon> {
        if let Some(used) = user_coupons::mark_used(&self.pool, user_id, id, now_millis()).await? {
            return Ok(used);
        }
        // Nothing updated: tell "not yours / missing" apart from "already used"
        match user_coupons::find_for_user(&self.pool, user_id, id).await? {
            Some(_) => Err(StoreError::Conflict("user coupon already used".into())),
            None => Err(StoreError::NotFound("user coupon")),
        }
    }
}
