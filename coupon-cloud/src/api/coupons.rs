//! Coupon catalog

use axum::{Json, extract::State};
use shared::models::Coupon;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/coupons - active coupons, newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Coupon>>> {
    let coupons = state.orders.list_coupons().await?;
    Ok(Json(coupons))
}
