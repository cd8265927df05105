//! coupon-cloud - coupon purchases paid through the Alfa-Bank gateway
//!
//! - Serves the active coupon catalog
//! - Creates orders and registers them with the payment gateway
//! - Reconciles order status on customer return, gateway callback and polling
//! - Grants the purchased coupon exactly once per paid order

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod orders;
pub mod state;
pub mod util;

pub use config::Config;
pub use state::AppState;
