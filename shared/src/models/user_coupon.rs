//! User Coupon Model (granted entitlements)

use serde::{Deserialize, Serialize};

/// Entitlement granted to a user once the order paying for it is `paid`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserCoupon {
    pub id: i64,
    pub user_id: String,
    pub coupon_id: i64,
    /// Paying order, unique per entitlement
    pub order_id: i64,
    pub activated_at: i64,
    pub is_used: bool,
    pub used_at: Option<i64>,
}

/// User coupon joined with coupon name and order number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserCouponView {
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub user_coupon: UserCoupon,
    pub coupon_name: Option<String>,
    pub order_number: Option<String>,
}
