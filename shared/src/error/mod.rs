//! Unified error system for the coupon payments service
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ErrorResponse`]: The JSON body every failed API call returns
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 3xxx: Coupon errors
//! - 4xxx: Order errors
//! - 5xxx: Payment gateway errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ErrorResponse};
//!
//! let err = AppError::new(ErrorCode::CouponNotFound);
//!
//! let err = AppError::with_message(ErrorCode::PaymentFailed, "Payment registration failed")
//!     .with_detail("order_id", 42);
//!
//! let body = ErrorResponse::from(&err);
//! assert!(!body.success);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, ErrorResponse};
