//! Per-user coupon and order views

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use shared::error::AppError;
use shared::models::{OrderSummary, UserCoupon, UserCouponView};

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/users/{user_id}/coupons
pub async fn coupons(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Vec<UserCouponView>>> {
    let Path(user_id) = path.map_err(invalid_path)?;
    let coupons = state.orders.user_coupons(&user_id).await?;
    Ok(Json(coupons))
}

/// GET /api/users/{user_id}/orders
pub async fn orders(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Vec<OrderSummary>>> {
    let Path(user_id) = path.map_err(invalid_path)?;
    let orders = state.orders.user_orders(&user_id).await?;
    Ok(Json(orders))
}

/// POST /api/users/{user_id}/coupons/{id}/use - redeem a coupon
pub async fn use_coupon(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<Json<UserCoupon>> {
    let Path((user_id, id)) = path.map_err(invalid_path)?;
    let used = state.orders.use_coupon(&user_id, id).await?;
    Ok(Json(used))
}

fn invalid_path(e: PathRejection) -> AppError {
    AppError::invalid_request(e.body_text())
}
