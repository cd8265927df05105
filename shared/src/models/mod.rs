//! Data models
//!
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL), all timestamps are Unix
//! milliseconds.

pub mod coupon;
pub mod order;
pub mod user_coupon;

// Re-exports
pub use coupon::*;
pub use order::*;
pub use user_coupon::*;
