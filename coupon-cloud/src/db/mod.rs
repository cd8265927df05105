//! Database access layer
//!
//! The PostgreSQL queries live in per-table modules as free functions over
//! `&PgPool`. [`PgStore`] exposes them through the repository traits the
//! order service depends on; [`MemoryStore`] implements the same traits
//! for tests.

pub mod coupons;
pub mod memory;
pub mod orders;
pub mod pg;
pub mod user_coupons;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Coupon, CouponCreate, NewOrder, Order, OrderStatus, OrderSummary, UserCoupon, UserCouponView,
};
use thiserror::Error;

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Row to update does not exist
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Unique constraint hit, or a one-shot update already applied
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Map unique violations to `Conflict`, everything else to `Database`
    pub fn from_insert(e: sqlx::Error, what: &str) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(format!("{what} already exists"))
            }
            _ => StoreError::Database(e),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn create_coupon(&self, coupon: &CouponCreate) -> StoreResult<Coupon>;

    /// Any coupon, active or not
    async fn find_coupon(&self, id: i64) -> StoreResult<Option<Coupon>>;

    /// Only coupons that can currently be bought
    async fn find_active_coupon(&self, id: i64) -> StoreResult<Option<Coupon>>;

    /// Active coupons, newest first
    async fn list_active_coupons(&self) -> StoreResult<Vec<Coupon>>;

    async fn count_coupons(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert in `created` status; `Conflict` on a duplicate order number
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order>;

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>>;

    async fn find_order_by_external_id(&self, external_order_id: &str)
    -> StoreResult<Option<Order>>;

    /// Set `to` only if the stored status is still `from`; returns whether it applied
    async fn transition_order_status(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool>;

    /// Record the gateway order id and payment form URL
    async fn set_order_external_id(
        &self,
        order_id: i64,
        external_order_id: &str,
        payment_url: &str,
    ) -> StoreResult<()>;

    /// Orders of a user, newest first, with coupon names
    async fn list_user_orders(&self, user_id: &str) -> StoreResult<Vec<OrderSummary>>;
}

#[async_trait]
pub trait UserCouponRepository: Send + Sync {
    /// Grant the coupon paid by `order_id` unless already granted; returns whether a row was created
    async fn activate_user_coupon(
        &self,
        user_id: &str,
        coupon_id: i64,
        order_id: i64,
    ) -> StoreResult<bool>;

    async fn find_user_coupon_by_order(&self, order_id: i64) -> StoreResult<Option<UserCoupon>>;

    /// Entitlements of a user, most recently activated first
    async fn list_user_coupons(&self, user_id: &str) -> StoreResult<Vec<UserCouponView>>;

    /// Redeem an entitlement owned by `user_id`
    ///
    /// `NotFound` when the user has no such entitlement, `Conflict` when it
    /// was already used.
    async fn mark_user_coupon_used(&self, user_id: &str, id: i64) -> StoreResult<UserCoupon>;
}

/// Everything the order service needs from storage
pub trait Store: CouponRepository + OrderRepository + UserCouponRepository {}

impl<T> Store for T where T: CouponRepository + OrderRepository + UserCouponRepository {}

/// Insert the demo catalog when no coupon exists yet; returns how many were created
pub async fn seed_demo_coupons(store: &dyn CouponRepository) -> StoreResult<usize> {
    if store.count_coupons().await? > 0 {
        tracing::info!("Coupon catalog already populated, skipping demo data");
        return Ok(0);
    }

    let demo = demo_coupons();
    for coupon in &demo {
        store.create_coupon(coupon).await?;
    }
    tracing::info!(count = demo.len(), "Created demo coupons");
    Ok(demo.len())
}

fn demo_coupons() -> Vec<CouponCreate> {
    let coupon = |name: &str, description: &str, rubles: i64| CouponCreate {
        name: name.to_string(),
        description: description.to_string(),
        price: Decimal::new(rubles * 100, 2),
        currency: "RUB".to_string(),
        is_active: true,
    };
    vec![
        coupon("10% discount", "10% off any purchase in the store", 100),
        coupon("20% discount", "20% off any purchase in the store", 200),
        coupon("Free delivery", "Free delivery for orders over 500 rubles", 50),
        coupon("50% discount", "50% off selected products", 500),
    ]
}
