//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::CouponNotFound
            | Self::UserCouponNotFound
            | Self::OrderNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists | Self::CouponAlreadyUsed => StatusCode::CONFLICT,

            // 502 Bad Gateway (the provider answered, but not with a payment)
            Self::PaymentFailed | Self::GatewayBadResponse => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::GatewayUnavailable | Self::NetworkError | Self::TimeoutError => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            Self::Unknown
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::OrderNumberConflict => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (validation errors)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::RequiredField => StatusCode::BAD_REQUEST,
        }
    }
}
