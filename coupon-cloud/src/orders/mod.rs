//! Order lifecycle
//!
//! [`OrderService`] is the only component that makes decisions: it creates
//! orders, registers them with the payment gateway, reconciles their status
//! with the gateway and grants the coupon once an order is paid.
//!
//! ```text
//! created --register ok-------> pending
//! created --register failed---> failed
//! pending --gateway 2---------> paid      (grants the coupon)
//! pending --gateway 6---------> failed
//! pending --gateway 1 / other-> pending
//! ```
//!
//! The gateway is the source of truth for payment success; local storage
//! may lag behind it. Storage failures after the gateway has answered do not
//! fail the operation, they are returned as [`Outcome::warnings`].

pub mod locks;
pub mod number;
pub mod status;

use std::sync::Arc;

use shared::models::{Coupon, NewOrder, Order, OrderStatus, OrderSummary, UserCoupon, UserCouponView};
use shared::payment::CreateOrderRequest;
use thiserror::Error;

use crate::config::Config;
use crate::db::{Store, StoreError};
use crate::gateway::{GatewayError, PaymentGateway, RegisterOrder, numeric_currency};

pub use locks::OrderLocks;
pub use status::StatusDecision;

/// Attempts at allocating an unused order number
const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// Advisory returned when the gateway could not be asked for the status
pub const STATUS_CHECK_ADVISORY: &str = "Failed to check payment status with the bank";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),
    #[error("Coupon {0} not found")]
    CouponNotFound(i64),
    #[error("Coupon {0} has an invalid price")]
    InvalidCouponPrice(i64),
    #[error("Order {0} not found")]
    OrderNotFound(String),
    #[error("User coupon {0} not found")]
    UserCouponNotFound(i64),
    #[error("User coupon {0} has already been used")]
    CouponAlreadyUsed(i64),
    #[error("Could not allocate a unique order number")]
    OrderNumberExhausted,
    /// Gateway refused or could not be reached; the order is now `failed`
    #[error("Payment registration failed for order {order_number}: {source}")]
    Registration {
        order_id: i64,
        order_number: String,
        #[source]
        source: GatewayError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type OrderResult<T> = Result<T, OrderError>;

/// Primary result plus the non-fatal problems met while producing it
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A registered order the customer can now pay
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
    pub order_id: i64,
    pub order_number: String,
    pub payment_url: String,
}

/// Result of a status check
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub order_id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    pub coupon_name: Option<String>,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    /// Set when the gateway could not be consulted
    pub advisory: Option<String>,
}

impl StatusReport {
    fn from_order(order: &Order, status: OrderStatus, coupon_name: Option<String>) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            status,
            coupon_name,
            amount: order.amount,
            currency: order.currency.clone(),
            advisory: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderSettings {
    /// Lifetime of the hosted payment form
    pub session_timeout_secs: u32,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            session_timeout_secs: 1200,
        }
    }
}

impl From<&Config> for OrderSettings {
    fn from(config: &Config) -> Self {
        Self {
            session_timeout_secs: config.payment_session_timeout_secs,
        }
    }
}

pub struct OrderService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    locks: OrderLocks,
    settings: OrderSettings,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("store", &"<Store>")
            .field("gateway", &"<PaymentGateway>")
            .field("locks", &self.locks.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        settings: OrderSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            locks: OrderLocks::new(),
            settings,
        }
    }

    pub fn locks(&self) -> &OrderLocks {
        &self.locks
    }

    // ========== Catalog / user queries ==========

    pub async fn list_coupons(&self) -> OrderResult<Vec<Coupon>> {
        Ok(self.store.list_active_coupons().await?)
    }

    pub async fn user_coupons(&self, user_id: &str) -> OrderResult<Vec<UserCouponView>> {
        let user_id = require_user(user_id)?;
        Ok(self.store.list_user_coupons(user_id).await?)
    }

    pub async fn user_orders(&self, user_id: &str) -> OrderResult<Vec<OrderSummary>> {
        let user_id = require_user(user_id)?;
        Ok(self.store.list_user_orders(user_id).await?)
    }

    /// Redeem one of the user's coupons
    pub async fn use_coupon(&self, user_id: &str, user_coupon_id: i64) -> OrderResult<UserCoupon> {
        let user_id = require_user(user_id)?;
        match self.store.mark_user_coupon_used(user_id, user_coupon_id).await {
            Ok(uc) => {
                tracing::info!(user_id, user_coupon_id, "User coupon redeemed");
                Ok(uc)
            }
            Err(StoreError::NotFound(_)) => Err(OrderError::UserCouponNotFound(user_coupon_id)),
            Err(StoreError::Conflict(_)) => Err(OrderError::CouponAlreadyUsed(user_coupon_id)),
            Err(e) => Err(e.into()),
        }
    }

    // ========== Create ==========

    /// Create an order for a coupon and register it with the gateway
    ///
    /// Fails before any side effect on bad input or an unknown/inactive
    /// coupon. Once the order row exists, a gateway failure marks it
    /// `failed` and returns [`OrderError::Registration`]. Once the gateway
    /// has issued a payment URL, the call succeeds even if recording it
    /// locally fails.
    pub async fn create_order(
        &self,
        req: &CreateOrderRequest,
    ) -> OrderResult<Outcome<CreatedOrder>> {
        let user_id = require_user(&req.user_id)?;
        let return_url = req.return_url.trim();
        if return_url.is_empty() {
            return Err(OrderError::InvalidInput("return_url is required".into()));
        }
        let fail_url = req
            .fail_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        let coupon = self
            .store
            .find_active_coupon(req.coupon_id)
            .await?
            .ok_or(OrderError::CouponNotFound(req.coupon_id))?;
        let amount = coupon
            .price_minor_units()
            .ok_or(OrderError::InvalidCouponPrice(coupon.id))?;

        let order = self
            .insert_order(NewOrder {
                order_number: String::new(),
                coupon_id: coupon.id,
                user_id: user_id.to_string(),
                amount,
                currency: coupon.currency.clone(),
                return_url: return_url.to_string(),
                fail_url: fail_url.clone(),
                description: format!("Coupon purchase: {}", coupon.name),
            })
            .await?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            coupon_id = coupon.id,
            user_id,
            amount,
            "Order created"
        );

        // Hold the order until its post-registration state is written
        let _guard = self.locks.lock(&order.order_number).await;

        let json_params = serde_json::json!({
            "couponId": coupon.id.to_string(),
            "userId": user_id,
            "orderId": order.id.to_string(),
        });
        let register = RegisterOrder {
            order_number: order.order_number.clone(),
            amount,
            currency: numeric_currency(&coupon.currency).map(str::to_string),
            return_url: return_url.to_string(),
            fail_url,
            description: Some(order.description.clone()),
            language: None,
            client_id: Some(user_id.to_string()),
            json_params: Some(json_params.to_string()),
            session_timeout_secs: Some(self.settings.session_timeout_secs),
        };

        let registered = match self.gateway.register(&register).await {
            Ok(registered) => registered,
            Err(e) => {
                tracing::warn!(
                    order_id = order.id,
                    order_number = %order.order_number,
                    error = %e,
                    "Payment registration failed"
                );
                let mut warnings = Vec::new();
                self.move_status(&order, OrderStatus::Created, OrderStatus::Failed, &mut warnings)
                    .await;
                return Err(OrderError::Registration {
                    order_id: order.id,
                    order_number: order.order_number,
                    source: e,
                });
            }
        };

        let mut outcome = Outcome::new(CreatedOrder {
            order_id: order.id,
            order_number: order.order_number.clone(),
            payment_url: registered.form_url.clone(),
        });

        if let Err(e) = self
            .store
            .set_order_external_id(order.id, &registered.external_order_id, &registered.form_url)
            .await
        {
            warn(
                &mut outcome.warnings,
                &order,
                format!(
                    "Failed to record gateway order id {}: {e}",
                    registered.external_order_id
                ),
            );
        }
        self.move_status(
            &order,
            OrderStatus::Created,
            OrderStatus::Pending,
            &mut outcome.warnings,
        )
        .await;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            external_order_id = %registered.external_order_id,
            "Order registered with payment gateway"
        );
        Ok(outcome)
    }

    /// Insert with a fresh order number, regenerating on collision
    async fn insert_order(&self, mut new_order: NewOrder) -> OrderResult<Order> {
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            new_order.order_number = number::generate(new_order.coupon_id, &new_order.user_id);
            match self.store.create_order(&new_order).await {
                Ok(order) => return Ok(order),
                Err(StoreError::Conflict(_)) => {
                    tracing::warn!(
                        order_number = %new_order.order_number,
                        attempt,
                        "Order number collision, regenerating"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(OrderError::OrderNumberExhausted)
    }

    // ========== Status ==========

    /// Reconcile an order with the gateway and return its resolved status
    pub async fn check_order_status(
        &self,
        order_number: &str,
    ) -> OrderResult<Outcome<StatusReport>> {
        let order_number = order_number.trim();
        if order_number.is_empty() {
            return Err(OrderError::InvalidInput("order number is required".into()));
        }

        let _guard = self.locks.lock(order_number).await;

        let order = self
            .store
            .find_order_by_number(order_number)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_number.to_string()))?;

        let mut warnings = Vec::new();
        let coupon_name = self.coupon_name(&order, &mut warnings).await;

        let external_order_id = match &order.external_order_id {
            Some(id) if order.is_registered() => id.clone(),
            _ => {
                // never registered: nothing to ask the gateway
                let report = StatusReport::from_order(&order, order.status, coupon_name);
                return Ok(Outcome {
                    value: report,
                    warnings,
                });
            }
        };

        let remote = match self.gateway.order_status(&external_order_id).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(
                    order_number = %order.order_number,
                    external_order_id = %external_order_id,
                    error = %e,
                    "Gateway status check failed, returning stored status"
                );
                let mut report = StatusReport::from_order(&order, order.status, coupon_name);
                report.advisory = Some(STATUS_CHECK_ADVISORY.to_string());
                return Ok(Outcome {
                    value: report,
                    warnings,
                });
            }
        };

        let resolved = match status::resolve(order.status, remote.order_status) {
            StatusDecision::Keep => order.status,
            StatusDecision::Move(to) => self.apply_transition(&order, to, &mut warnings).await,
            StatusDecision::Unknown(code) => {
                tracing::warn!(
                    order_number = %order.order_number,
                    status = %order.status,
                    gateway_status = code,
                    action_code = ?remote.action_code,
                    "Unmapped gateway status code, order left unchanged"
                );
                order.status
            }
            StatusDecision::Frozen { reported } => {
                tracing::warn!(
                    order_number = %order.order_number,
                    status = %order.status,
                    gateway_status = remote.order_status,
                    reported = %reported,
                    "Gateway disagrees with terminal order status, order left unchanged"
                );
                order.status
            }
        };

        if resolved == OrderStatus::Paid {
            self.activate(&order, &mut warnings).await;
        }

        let report = StatusReport::from_order(&order, resolved, coupon_name);
        Ok(Outcome {
            value: report,
            warnings,
        })
    }

    /// Resolve an order by its gateway id, then run [`Self::check_order_status`]
    pub async fn check_by_external_id(
        &self,
        external_order_id: &str,
    ) -> OrderResult<Outcome<StatusReport>> {
        let external_order_id = external_order_id.trim();
        if external_order_id.is_empty() {
            return Err(OrderError::InvalidInput("gateway order id is required".into()));
        }
        let order = self
            .store
            .find_order_by_external_id(external_order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(external_order_id.to_string()))?;
        self.check_order_status(&order.order_number).await
    }

    /// Persist a gateway-driven transition; returns the status to report
    async fn apply_transition(
        &self,
        order: &Order,
        to: OrderStatus,
        warnings: &mut Vec<String>,
    ) -> OrderStatus {
        match self.store.transition_order_status(order.id, order.status, to).await {
            Ok(true) => {
                tracing::info!(
                    order_id = order.id,
                    order_number = %order.order_number,
                    from = %order.status,
                    to = %to,
                    "Order status updated"
                );
                to
            }
            Ok(false) => {
                // Changed underneath us (another instance); report what is stored now
                match self.store.find_order_by_number(&order.order_number).await {
                    Ok(Some(current)) => {
                        tracing::info!(
                            order_number = %order.order_number,
                            expected = %order.status,
                            stored = %current.status,
                            "Order status changed concurrently"
                        );
                        current.status
                    }
                    Ok(None) => to,
                    Err(e) => {
                        warn(warnings, order, format!("Failed to re-read order status: {e}"));
                        to
                    }
                }
            }
            Err(e) => {
                warn(
                    warnings,
                    order,
                    format!("Failed to update order status to {to}: {e}"),
                );
                to
            }
        }
    }

    /// Conditional status write used by order creation; failures become warnings
    async fn move_status(
        &self,
        order: &Order,
        from: OrderStatus,
        to: OrderStatus,
        warnings: &mut Vec<String>,
    ) {
        match self.store.transition_order_status(order.id, from, to).await {
            Ok(true) => {}
            Ok(false) => warn(
                warnings,
                order,
                format!("Order was no longer {from}, status {to} not applied"),
            ),
            Err(e) => warn(
                warnings,
                order,
                format!("Failed to update order status to {to}: {e}"),
            ),
        }
    }

    /// Grant the coupon paid by `order`; safe to repeat
    async fn activate(&self, order: &Order, warnings: &mut Vec<String>) {
        match self
            .store
            .activate_user_coupon(&order.user_id, order.coupon_id, order.id)
            .await
        {
            Ok(true) => tracing::info!(
                order_id = order.id,
                order_number = %order.order_number,
                user_id = %order.user_id,
                coupon_id = order.coupon_id,
                "Coupon activated"
            ),
            Ok(false) => {}
            Err(e) => warn(warnings, order, format!("Failed to activate coupon: {e}")),
        }
    }

    async fn coupon_name(&self, order: &Order, warnings: &mut Vec<String>) -> Option<String> {
        match self.store.find_coupon(order.coupon_id).await {
            Ok(coupon) => coupon.map(|c| c.name),
            Err(e) => {
                warn(warnings, order, format!("Failed to load coupon: {e}"));
                None
            }
        }
    }
}

fn require_user(user_id: &str) -> OrderResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(OrderError::InvalidInput("user_id is required".into()));
    }
    Ok(user_id)
}

fn warn(warnings: &mut Vec<String>, order: &Order, message: String) {
    tracing::warn!(
        order_id = order.id,
        order_number = %order.order_number,
        "{message}"
    );
    warnings.push(message);
}
