//! Payment API payloads
//!
//! Request and response bodies of the `/api` order endpoints, plus the
//! query/form shapes the payment gateway sends back to us.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::OrderStatus;

/// `POST /api/orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub coupon_id: i64,
    pub user_id: String,
    pub return_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub order_number: String,
    pub payment_url: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `GET /api/orders/{order_number}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusResponse {
    pub order_id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_name: Option<String>,
    /// Major units (e.g. `100.00` rubles)
    pub amount: Decimal,
    pub currency: String,
    pub success: bool,
    /// Advisory when the gateway could not be consulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Query string of the customer's redirect back from the hosted payment form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReturnQuery {
    #[serde(default)]
    pub order_number: Option<String>,
    /// Gateway order id
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Form body of the gateway's callback notification
///
/// Only used to locate the order; the status it claims is never trusted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    #[serde(default)]
    pub order_number: Option<String>,
    /// Gateway order id
    #[serde(default)]
    pub order_id: Option<String>,
    /// Gateway order id, as the callback names it
    #[serde(default)]
    pub md_order: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl PaymentNotification {
    /// Gateway order id from whichever of `orderId` / `mdOrder` is filled
    pub fn gateway_order_id(&self) -> Option<&str> {
        [self.order_id.as_deref(), self.md_order.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|id| !id.is_empty())
    }
}
