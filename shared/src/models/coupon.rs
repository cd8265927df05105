//! Coupon Model

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Purchasable coupon definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Price in major currency units (e.g. rubles)
    pub price: Decimal,
    /// ISO 4217 alphabetic code
    pub currency: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Coupon {
    /// Price snapshot in minor units, `round(price * 100)`
    ///
    /// Returns `None` for negative prices or values that do not fit in `i64`.
    pub fn price_minor_units(&self) -> Option<i64> {
        to_minor_units(self.price)
    }
}

/// Create coupon payload (seed/admin data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponCreate {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub is_active: bool,
}

/// Convert a major-unit amount to minor units, rounding half away from zero
pub fn to_minor_units(price: Decimal) -> Option<i64> {
    if price.is_sign_negative() {
        return None;
    }
    (price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Convert a minor-unit amount back to major units (two decimal places)
pub fn from_minor_units(amount: i64) -> Decimal {
    Decimal::new(amount, 2)
}
