//! Test doubles shared by the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use coupon_cloud::db::{
    CouponRepository, MemoryStore, OrderRepository, StoreError, StoreResult, UserCouponRepository,
};
use coupon_cloud::gateway::{
    GatewayError, GatewayOrderStatus, PaymentGateway, RegisterOrder, RegisteredOrder,
};
use coupon_cloud::orders::{OrderService, OrderSettings};
use rust_decimal::Decimal;
use shared::models::{
    Coupon, CouponCreate, NewOrder, Order, OrderStatus, OrderSummary, UserCoupon, UserCouponView,
};
use shared::payment::CreateOrderRequest;

// ── Scripted gateway ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum RegisterReply {
    /// `ext{n}` / `https://pay/ext{n}`, n = call number
    Accept,
    Reject { code: String, message: String },
    Timeout,
}

#[derive(Debug, Clone)]
pub enum StatusReply {
    Code(i32),
    Timeout,
    Reject { code: String, message: String },
}

pub struct ScriptedGateway {
    register_reply: Mutex<RegisterReply>,
    status_reply: Mutex<StatusReply>,
    pub register_calls: Mutex<Vec<RegisterOrder>>,
    pub status_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            register_reply: Mutex::new(RegisterReply::Accept),
            status_reply: Mutex::new(StatusReply::Code(1)),
            register_calls: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn on_register(&self, reply: RegisterReply) {
        *self.register_reply.lock().unwrap() = reply;
    }

    pub fn on_status(&self, reply: StatusReply) {
        *self.status_reply.lock().unwrap() = reply;
    }

    pub fn register_count(&self) -> usize {
        self.register_calls.lock().unwrap().len()
    }

    pub fn last_register(&self) -> RegisterOrder {
        self.register_calls.lock().unwrap().last().cloned().unwrap()
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn register(&self, order: &RegisterOrder) -> Result<RegisteredOrder, GatewayError> {
        let n = {
            let mut calls = self.register_calls.lock().unwrap();
            calls.push(order.clone());
            calls.len()
        };
        let reply = self.register_reply.lock().unwrap().clone();
        match reply {
            RegisterReply::Accept => Ok(RegisteredOrder {
                external_order_id: format!("ext{n}"),
                form_url: format!("https://pay/ext{n}"),
            }),
            RegisterReply::Reject { code, message } => Err(GatewayError::Rejected { code, message }),
            RegisterReply::Timeout => Err(GatewayError::Timeout),
        }
    }

    async fn order_status(
        &self,
        _external_order_id: &str,
    ) -> Result<GatewayOrderStatus, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        // let concurrent checks overlap
        tokio::task::yield_now().await;
        let reply = self.status_reply.lock().unwrap().clone();
        match reply {
            StatusReply::Code(code) => Ok(GatewayOrderStatus {
                order_status: code,
                ..Default::default()
            }),
            StatusReply::Timeout => Err(GatewayError::Timeout),
            StatusReply::Reject { code, message } => Err(GatewayError::Rejected { code, message }),
        }
    }
}

// ── Failure-injecting store ─────────────────────────────────────────

/// `MemoryStore` whose writes can be made to fail with a database error
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_transitions: AtomicBool,
    pub fail_external_id: AtomicBool,
    pub fail_activation: AtomicBool,
    pub fail_coupon_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(flag: &AtomicBool) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CouponRepository for FlakyStore {
    async fn create_coupon(&self, coupon: &CouponCreate) -> StoreResult<Coupon> {
        self.inner.create_coupon(coupon).await
    }

    async fn find_coupon(&self, id: i64) -> StoreResult<Option<Coupon>> {
        Self::check(&self.fail_coupon_reads)?;
        self.inner.find_coupon(id).await
    }

    async fn find_active_coupon(&self, id: i64) -> StoreResult<Option<Coupon>> {
        self.inner.find_active_coupon(id).await
    }

    async fn list_active_coupons(&self) -> StoreResult<Vec<Coupon>> {
        self.inner.list_active_coupons().await
    }

    async fn count_coupons(&self) -> StoreResult<i64> {
        self.inner.count_coupons().await
    }
}

#[async_trait]
impl OrderRepository for FlakyStore {
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order> {
        self.inner.create_order(order).await
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        self.inner.find_order_by_number(order_number).await
    }

    async fn find_order_by_external_id(
        &self,
        external_order_id: &str,
    ) -> StoreResult<Option<Order>> {
        self.inner.find_order_by_external_id(external_order_id).await
    }

    async fn transition_order_status(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool> {
        Self::check(&self.fail_transitions)?;
        self.inner.transition_order_status(order_id, from, to).await
    }

    async fn set_order_external_id(
        &self,
        order_id: i64,
        external_order_id: &str,
        payment_url: &str,
    ) -> StoreResult<()> {
        Self::check(&self.fail_external_id)?;
        self.inner
            .set_order_external_id(order_id, external_order_id, payment_url)
            .await
    }

    async fn list_user_orders(&self, user_id: &str) -> StoreResult<Vec<OrderSummary>> {
        self.inner.list_user_orders(user_id).await
    }
}

#[async_trait]
impl UserCouponRepository for FlakyStore {
    async fn activate_user_coupon(
        &self,
        user_id: &str,
        coupon_id: i64,
        order_id: i64,
    ) -> StoreResult<bool> {
        Self::check(&self.fail_activation)?;
        self.inner
            .activate_user_coupon(user_id, coupon_id, order_id)
            .await
    }

    async fn find_user_coupon_by_order(&self, order_id: i64) -> StoreResult<Option<UserCoupon>> {
        self.inner.find_user_coupon_by_order(order_id).await
    }

    async fn list_user_coupons(&self, user_id: &str) -> StoreResult<Vec<UserCouponView>> {
        self.inner.list_user_coupons(user_id).await
    }

    async fn mark_user_coupon_used(&self, user_id: &str, id: i64) -> StoreResult<UserCoupon> {
        self.inner.mark_user_coupon_used(user_id, id).await
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn coupon(name: &str, cents: i64, is_active: bool) -> CouponCreate {
    CouponCreate {
        name: name.to_string(),
        description: format!("{name} description"),
        price: Decimal::new(cents, 2),
        currency: "RUB".to_string(),
        is_active,
    }
}

pub fn order_request(coupon_id: i64, user_id: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        coupon_id,
        user_id: user_id.to_string(),
        return_url: "https://shop.example/payment/return".to_string(),
        fail_url: Some("https://shop.example/payment/fail".to_string()),
    }
}

pub struct Harness<S> {
    pub store: Arc<S>,
    pub gateway: Arc<ScriptedGateway>,
    pub service: Arc<OrderService>,
}

pub fn harness<S>(store: S) -> Harness<S>
where
    S: CouponRepository + OrderRepository + UserCouponRepository + 'static,
{
    let store = Arc::new(store);
    let gateway = Arc::new(ScriptedGateway::new());
    let service = Arc::new(OrderService::new(
        store.clone(),
        gateway.clone(),
        OrderSettings::default(),
    ));
    Harness {
        store,
        gateway,
        service,
    }
}
