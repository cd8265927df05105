//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment lifecycle status of an order
///
/// `Created` and `Pending` can still move; `Paid`, `Failed` and `Cancelled`
/// are terminal. `Cancelled` is reserved for manual cancellation and is not
/// produced by any automatic transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Persisted locally, not yet registered with the gateway
    #[default]
    Created,
    /// Registered with the gateway, waiting for the customer to pay
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl OrderStatus {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Raised when a stored status string is not a known [`OrderStatus`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct InvalidOrderStatus(pub String);

impl TryFrom<String> for OrderStatus {
    type Error = InvalidOrderStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_db(&value).ok_or(InvalidOrderStatus(value))
    }
}

/// One purchase attempt for a coupon by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Locally generated, globally unique, never changes
    pub order_number: String,
    /// Gateway order id, set once registration succeeds
    pub external_order_id: Option<String>,
    pub coupon_id: i64,
    pub user_id: String,
    /// Amount in minor units, snapshotted from the coupon price
    pub amount: i64,
    pub currency: String,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: OrderStatus,
    /// Hosted payment form returned by the gateway
    pub payment_url: Option<String>,
    pub return_url: String,
    pub fail_url: Option<String>,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Whether the order has been registered with the gateway
    pub fn is_registered(&self) -> bool {
        self.external_order_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }
}

/// Insert payload for a new order (always starts as `created`)
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub coupon_id: i64,
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub return_url: String,
    pub fail_url: Option<String>,
    pub description: String,
}

/// Order joined with the name of its coupon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderSummary {
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub order: Order,
    pub coupon_name: Option<String>,
}
