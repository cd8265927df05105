//! API routes for coupon-cloud

pub mod coupons;
pub mod health;
pub mod orders;
pub mod payment;
pub mod users;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    // Catalog and orders
    let shop = Router::new()
        .route("/coupons", get(coupons::list))
        .route("/orders", post(orders::create))
        .route("/orders/{order_number}/status", get(orders::status));

    // Per-user views
    let users = Router::new()
        .route("/users/{user_id}/coupons", get(users::coupons))
        .route("/users/{user_id}/orders", get(users::orders))
        .route("/users/{user_id}/coupons/{id}/use", post(users::use_coupon));

    // Gateway redirect and callback
    let payment = Router::new()
        .route("/payment/return", get(payment::payment_return))
        .route("/payment/notification", post(payment::notification));

    shop.merge(users).merge(payment)
}
