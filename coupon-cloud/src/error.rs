//! Mapping of service-layer errors onto the API error
//!
//! `OrderError` and `StoreError` carry what went wrong inside the service;
//! `AppError` is what the client sees. Infrastructure failures are logged
//! here and reduced to a generic message.

use shared::error::{AppError, ErrorCode};

use crate::db::StoreError;
use crate::gateway::GatewayError;
use crate::orders::OrderError;

/// Convenience type alias for handler results
pub type ApiResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::not_found(what),
            StoreError::Conflict(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            StoreError::Database(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Rejected { code, message } => {
                let text = if message.is_empty() {
                    ErrorCode::PaymentFailed.message().to_string()
                } else {
                    message
                };
                AppError::with_message(ErrorCode::PaymentFailed, text)
                    .with_detail("gateway_code", code)
            }
            e if e.is_unavailable() => AppError::new(ErrorCode::GatewayUnavailable),
            _ => AppError::new(ErrorCode::GatewayBadResponse),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidInput(msg) => AppError::invalid_request(msg),
            OrderError::CouponNotFound(id) => {
                AppError::new(ErrorCode::CouponNotFound).with_detail("coupon_id", id)
            }
            OrderError::OrderNotFound(number) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("order_number", number)
            }
            OrderError::UserCouponNotFound(id) => {
                AppError::new(ErrorCode::UserCouponNotFound).with_detail("user_coupon_id", id)
            }
            OrderError::CouponAlreadyUsed(id) => {
                AppError::new(ErrorCode::CouponAlreadyUsed).with_detail("user_coupon_id", id)
            }
            OrderError::InvalidCouponPrice(id) => {
                tracing::error!(coupon_id = id, "Coupon price cannot be charged");
                AppError::internal("Coupon price is invalid").with_detail("coupon_id", id)
            }
            OrderError::OrderNumberExhausted => AppError::new(ErrorCode::OrderNumberConflict),
            OrderError::Registration {
                order_id,
                order_number,
                source,
            } => AppError::from(source)
                .with_detail("order_id", order_id)
                .with_detail("order_number", order_number),
            OrderError::Store(e) => e.into(),
        }
    }
}
