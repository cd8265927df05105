//! Payment gateway integration
//!
//! The orchestrator only sees [`PaymentGateway`]; [`alfa::AlfaBankClient`]
//! speaks the Alfa-Bank RBS REST protocol (`register.do`,
//! `getOrderStatus.do`).

pub mod alfa;

use async_trait::async_trait;
use thiserror::Error;

pub use alfa::{AlfaBankClient, AlfaBankConfig};

/// Numeric ISO 4217 code sent when the caller does not choose a currency (RUB)
pub const DEFAULT_CURRENCY: &str = "810";
/// Payment page language sent when the caller does not choose one
pub const DEFAULT_LANGUAGE: &str = "ru";

/// Gateway order status codes
pub mod status_code {
    /// Registered, customer has not paid yet
    pub const REGISTERED: i32 = 0;
    /// Payment in progress (amount on hold)
    pub const IN_PROGRESS: i32 = 1;
    /// Fully paid
    pub const PAID: i32 = 2;
    pub const AUTHORIZATION_REVERSED: i32 = 3;
    pub const REFUNDED: i32 = 4;
    /// Card issuer authentication started
    pub const ACS_AUTHORIZATION: i32 = 5;
    /// Authorization declined
    pub const DECLINED: i32 = 6;
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Transport(String),
    #[error("Gateway request timed out")]
    Timeout,
    #[error("Invalid gateway response: {0}")]
    BadResponse(String),
    /// The provider answered with a non-zero `errorCode`
    #[error("Gateway error {code}: {message}")]
    Rejected { code: String, message: String },
}

impl GatewayError {
    /// Transport-level failure (nothing usable came back)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_decode() {
            GatewayError::BadResponse(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// Order registration request
///
/// `None` fields are either omitted from the wire request or replaced by
/// the client defaults ([`DEFAULT_CURRENCY`], [`DEFAULT_LANGUAGE`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterOrder {
    pub order_number: String,
    /// Minor units
    pub amount: i64,
    /// Numeric ISO 4217 code
    pub currency: Option<String>,
    pub return_url: String,
    pub fail_url: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub client_id: Option<String>,
    /// JSON object string attached to the gateway order
    pub json_params: Option<String>,
    pub session_timeout_secs: Option<u32>,
}

/// Successful registration
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredOrder {
    /// Gateway order id, used for every later status query
    pub external_order_id: String,
    /// Hosted payment form the customer is redirected to
    pub form_url: String,
}

/// Gateway view of an order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayOrderStatus {
    /// See [`status_code`]
    pub order_status: i32,
    pub order_number: Option<String>,
    pub action_code: Option<i32>,
    pub action_code_description: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

/// Remote payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register an order and obtain the hosted payment form URL
    async fn register(&self, order: &RegisterOrder) -> Result<RegisteredOrder, GatewayError>;

    /// Query the current status of a registered order
    async fn order_status(
        &self,
        external_order_id: &str,
    ) -> Result<GatewayOrderStatus, GatewayError>;
}

/// Map an ISO 4217 alphabetic code to the numeric code the gateway expects
pub fn numeric_currency(alpha: &str) -> Option<&'static str> {
    match alpha.trim().to_ascii_uppercase().as_str() {
        "RUB" => Some("810"),
        "USD" => Some("840"),
        "EUR" => Some("978"),
        _ => None,
    }
}
