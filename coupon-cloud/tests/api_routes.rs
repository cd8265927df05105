//! HTTP surface, end to end through the router

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{FlakyStore, RegisterReply, ScriptedGateway, StatusReply, coupon};
use coupon_cloud::AppState;
use coupon_cloud::api::create_router;
use coupon_cloud::db::{CouponRepository, MemoryStore, OrderRepository, Store};
use coupon_cloud::orders::OrderSettings;
use serde_json::{Value, json};
use shared::models::OrderStatus;
use tower::ServiceExt;

struct TestApp<S = MemoryStore> {
    router: Router,
    store: Arc<S>,
    gateway: Arc<ScriptedGateway>,
}

fn app() -> TestApp {
    app_with(MemoryStore::new())
}

fn app_with<S: Store + 'static>(store: S) -> TestApp<S> {
    let store = Arc::new(store);
    let gateway = Arc::new(ScriptedGateway::new());
    let state = AppState::from_parts(store.clone(), gateway.clone(), OrderSettings::default());
    TestApp {
        router: create_router(state),
        store,
        gateway,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

async fn create_order<S>(app: &TestApp<S>, coupon_id: i64, user_id: &str) -> Value {
    let (status, body) = post_json(
        &app.router,
        "/api/orders",
        json!({
            "coupon_id": coupon_id,
            "user_id": user_id,
            "return_url": "https://shop.example/payment/return",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn health_reports_service() {
    let app = app();
    let (status, body) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "coupon-cloud");
}

#[tokio::test]
async fn catalog_lists_only_active_coupons() {
    let app = app();
    app.store.create_coupon(&coupon("10% discount", 10000, true)).await.unwrap();
    app.store.create_coupon(&coupon("Retired", 3000, false)).await.unwrap();

    let (status, body) = get_json(&app.router, "/api/coupons").await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "10% discount");
    assert_eq!(list[0]["price"], 100.0);
    assert_eq!(list[0]["currency"], "RUB");
}

#[tokio::test]
async fn create_order_returns_payment_url() {
    let app = app();
    let c = app.store.create_coupon(&coupon("A", 10000, true)).await.unwrap();

    let body = create_order(&app, c.id, "u1").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["payment_url"], "https://pay/ext1");
    assert_eq!(body["message"], "Order created successfully");
    assert!(body["order_id"].as_i64().unwrap() > 0);
    assert!(body["order_number"].as_str().unwrap().starts_with("COUPON_"));
}

#[tokio::test]
async fn create_order_error_envelopes() {
    let app = app();
    let c = app.store.create_coupon(&coupon("A", 10000, true)).await.unwrap();

    // unknown coupon
    let (status, body) = post_json(
        &app.router,
        "/api/orders",
        json!({ "coupon_id": 404, "user_id": "u1", "return_url": "https://shop/r" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 3001);

    // malformed body
    let (status, body) = post_json(&app.router, "/api/orders", json!({ "user_id": "u1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 5);

    // gateway down: order is failed, client learns its number
    app.gateway.on_register(RegisterReply::Timeout);
    let (status, body) = post_json(
        &app.router,
        "/api/orders",
        json!({ "coupon_id": c.id, "user_id": "u1", "return_url": "https://shop/r" }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 5003);
    let number = body["details"]["order_number"].as_str().unwrap();
    let order = app.store.find_order_by_number(number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);

    // gateway refusal
    app.gateway.on_register(RegisterReply::Reject {
        code: "5".into(),
        message: "Access denied".into(),
    });
    let (status, body) = post_json(
        &app.router,
        "/api/orders",
        json!({ "coupon_id": c.id, "user_id": "u1", "return_url": "https://shop/r" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], 5001);
    assert_eq!(body["message"], "Access denied");
    assert_eq!(body["details"]["gateway_code"], "5");
}

#[tokio::test]
async fn order_status_endpoint_reconciles() {
    let app = app();
    let c = app.store.create_coupon(&coupon("10% discount", 10000, true)).await.unwrap();
    let created = create_order(&app, c.id, "u1").await;
    let number = created["order_number"].as_str().unwrap();
    let uri = format!("/api/orders/{number}/status");

    let (status, body) = get_json(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["amount"], 100.0);
    assert_eq!(body["coupon_name"], "10% discount");

    app.gateway.on_status(StatusReply::Code(2));
    let (_, body) = get_json(&app.router, &uri).await;
    assert_eq!(body["status"], "paid");
    assert_eq!(body["success"], true);
    assert!(body.get("message").is_none());

    app.gateway.on_status(StatusReply::Timeout);
    let (status, body) = get_json(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");
    assert_eq!(body["message"], "Failed to check payment status with the bank");

    let (status, body) = get_json(&app.router, "/api/orders/NOPE/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);
}

#[tokio::test]
async fn user_endpoints_list_and_redeem() {
    let app = app();
    let c = app.store.create_coupon(&coupon("Free delivery", 5000, true)).await.unwrap();
    let created = create_order(&app, c.id, "u1").await;
    let number = created["order_number"].as_str().unwrap();

    app.gateway.on_status(StatusReply::Code(2));
    get_json(&app.router, &format!("/api/orders/{number}/status")).await;

    let (status, body) = get_json(&app.router, "/api/users/u1/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["order_number"], number);
    assert_eq!(body[0]["status"], "paid");
    assert_eq!(body[0]["coupon_name"], "Free delivery");

    let (_, body) = get_json(&app.router, "/api/users/u1/coupons").await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["coupon_name"], "Free delivery");
    assert_eq!(list[0]["is_used"], false);
    let id = list[0]["id"].as_i64().unwrap();

    let use_uri = format!("/api/users/u1/coupons/{id}/use");
    let request = Request::post(&use_uri).body(Body::empty()).unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let used: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(used["is_used"], true);

    let request = Request::post(&use_uri).body(Body::empty()).unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["code"], 3002);

    let request = Request::post(format!("/api/users/u2/coupons/{id}/use"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_return_renders_result_page() {
    let app = app();
    let c = app
        .store
        .create_coupon(&coupon("<script>alert(1)</script>", 10000, true))
        .await
        .unwrap();
    let created = create_order(&app, c.id, "u1").await;
    let number = created["order_number"].as_str().unwrap();

    app.gateway.on_status(StatusReply::Code(2));
    let request = Request::get(format!("/api/payment/return?orderNumber={number}"))
        .body(Body::empty())
        .unwrap();
    let (status, html) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Payment completed"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
    assert_eq!(app.store.user_coupon_count().await, 1);

    // gateway id only, as the hosted form appends it
    let request = Request::get("/api/payment/return?orderId=ext1")
        .body(Body::empty())
        .unwrap();
    let (status, html) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Payment completed"));
    assert_eq!(app.store.user_coupon_count().await, 1);
}

#[tokio::test]
async fn payment_return_declined_and_missing() {
    let app = app();
    let c = app.store.create_coupon(&coupon("A", 10000, true)).await.unwrap();
    let created = create_order(&app, c.id, "u1").await;
    let number = created["order_number"].as_str().unwrap();

    app.gateway.on_status(StatusReply::Code(6));
    let request = Request::get(format!("/api/payment/return?orderNumber={number}"))
        .body(Body::empty())
        .unwrap();
    let (status, html) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Payment declined"));

    let request = Request::get("/api/payment/return").body(Body::empty()).unwrap();
    let (status, html) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("Order not specified"));

    let request = Request::get("/api/payment/return?orderNumber=NOPE")
        .body(Body::empty())
        .unwrap();
    let (status, html) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Payment status unavailable"));
}

#[tokio::test]
async fn notification_rechecks_and_always_acknowledges() {
    let app = app();
    let c = app.store.create_coupon(&coupon("A", 10000, true)).await.unwrap();
    let created = create_order(&app, c.id, "u1").await;
    let number = created["order_number"].as_str().unwrap().to_string();

    let form = |body: String| {
        Request::post("/api/payment/notification")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    };

    // the claimed status is ignored; the gateway still says "in progress"
    app.gateway.on_status(StatusReply::Code(1));
    let (status, body) = send(
        &app.router,
        form(format!("orderNumber={number}&mdOrder=ext1&operation=deposited&status=1")),
    )
    .await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));
    assert_eq!(app.store.user_coupon_count().await, 0);

    app.gateway.on_status(StatusReply::Code(2));
    let (status, body) = send(
        &app.router,
        form(format!("orderNumber={number}&operation=deposited&status=1")),
    )
    .await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));
    assert_eq!(app.store.user_coupon_count().await, 1);
    let order = app.store.find_order_by_number(&number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    // unknown order and empty form are acknowledged too
    let (status, body) = send(&app.router, form("orderNumber=NOPE".into())).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));
    let (status, body) = send(&app.router, form(String::new())).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));
}

#[tokio::test]
async fn notification_with_both_gateway_id_fields_is_processed() {
    let app = app();
    let c = app.store.create_coupon(&coupon("A", 10000, true)).await.unwrap();
    let created = create_order(&app, c.id, "u1").await;
    let number = created["order_number"].as_str().unwrap().to_string();

    app.gateway.on_status(StatusReply::Code(2));
    let request = Request::post("/api/payment/notification")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "orderNumber={number}&orderId=ext1&mdOrder=ext1&operation=deposited&status=1"
        )))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));
    assert_eq!(app.gateway.status_count(), 1);
    assert_eq!(app.store.user_coupon_count().await, 1);
}

#[tokio::test]
async fn notification_with_md_order_only_is_processed() {
    let app = app();
    let c = app.store.create_coupon(&coupon("A", 10000, true)).await.unwrap();
    create_order(&app, c.id, "u1").await;

    app.gateway.on_status(StatusReply::Code(2));
    let request = Request::post("/api/payment/notification")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("mdOrder=ext1&operation=deposited&status=1"))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.user_coupon_count().await, 1);
}

#[tokio::test]
async fn malformed_path_gets_error_envelope() {
    let app = app();

    let request = Request::post("/api/users/u1/coupons/abc/use")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 5);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn storage_warnings_reach_the_response_message() {
    let app = app_with(FlakyStore::new());
    let c = app.store.create_coupon(&coupon("A", 10000, true)).await.unwrap();

    app.store.fail_transitions.store(true, Ordering::SeqCst);
    let body = create_order(&app, c.id, "u1").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["payment_url"], "https://pay/ext1");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Order created successfully; 1 warning(s)"), "{message}");

    let number = body["order_number"].as_str().unwrap();
    app.gateway.on_status(StatusReply::Code(2));
    let (status, body) = get_json(&app.router, &format!("/api/orders/{number}/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");
    assert!(body["message"].as_str().unwrap().starts_with("1 warning(s)"));

    app.store.fail_transitions.store(false, Ordering::SeqCst);
    let (_, body) = get_json(&app.router, &format!("/api/orders/{number}/status")).await;
    assert_eq!(body["status"], "paid");
    assert!(body.get("message").is_none());
}
