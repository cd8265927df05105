//! Shared types for the coupon payments service
//!
//! Domain models, API payloads and the unified error system used by
//! `coupon-cloud` and its tests.

pub mod error;
pub mod models;
pub mod payment;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
