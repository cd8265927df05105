//! Payment gateway redirect page and callback
//!
//! Neither endpoint trusts what the gateway (or the browser) claims about the
//! payment: both locate the order and re-run the status check.

use axum::{
    Form,
    extract::{Query, State, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use shared::error::AppError;
use shared::models::OrderStatus;
use shared::payment::{PaymentNotification, PaymentReturnQuery};

use crate::orders::{OrderResult, Outcome, StatusReport};
use crate::state::AppState;
use crate::util::escape_html;

/// GET /api/payment/return?orderNumber=...|orderId=... - customer lands here after paying
pub async fn payment_return(
    State(state): State<AppState>,
    Query(query): Query<PaymentReturnQuery>,
) -> Response {
    let order_number = non_empty(query.order_number.as_deref());
    let external_id = non_empty(query.order_id.as_deref());

    let result = match (order_number, external_id) {
        (Some(number), _) => state.orders.check_order_status(number).await,
        (None, Some(external_id)) => state.orders.check_by_external_id(external_id).await,
        (None, None) => {
            return (
                StatusCode::BAD_REQUEST,
                Html(render_page(
                    "error",
                    "Order not specified",
                    "The payment link is missing the order number.",
                )),
            )
                .into_response();
        }
    };

    match result {
        Ok(outcome) => Html(render_result(&outcome.value)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Payment return status check failed");
            let err = AppError::from(e);
            (
                err.http_status(),
                Html(render_page(
                    "error",
                    "Payment status unavailable",
                    &escape_html(&err.message),
                )),
            )
                .into_response()
        }
    }
}

/// POST /api/payment/notification - gateway callback, always answered with `OK`
pub async fn notification(
    State(state): State<AppState>,
    form: Result<Form<PaymentNotification>, FormRejection>,
) -> (StatusCode, &'static str) {
    let notification = match form {
        Ok(Form(n)) => n,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable payment notification");
            return (StatusCode::OK, "OK");
        }
    };

    tracing::info!(
        order_number = ?notification.order_number,
        order_id = ?notification.gateway_order_id(),
        operation = ?notification.operation,
        claimed_status = ?notification.status,
        "Payment notification received"
    );

    let order_number = non_empty(notification.order_number.as_deref());
    let external_id = notification.gateway_order_id();

    let result: Option<OrderResult<Outcome<StatusReport>>> = match (order_number, external_id) {
        (Some(number), _) => Some(state.orders.check_order_status(number).await),
        (None, Some(external_id)) => Some(state.orders.check_by_external_id(external_id).await),
        (None, None) => None,
    };

    match result {
        Some(Ok(outcome)) => tracing::info!(
            order_number = %outcome.value.order_number,
            status = %outcome.value.status,
            warnings = outcome.warnings.len(),
            "Payment notification processed"
        ),
        Some(Err(e)) => tracing::warn!(error = %e, "Payment notification processing failed"),
        None => tracing::warn!("Payment notification without order reference ignored"),
    }

    (StatusCode::OK, "OK")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn render_result(report: &StatusReport) -> String {
    match report.status {
        OrderStatus::Paid => {
            let coupon = escape_html(report.coupon_name.as_deref().unwrap_or("Your coupon"));
            render_page(
                "success",
                "&#10003; Payment completed",
                &format!("Coupon \"{coupon}\" has been activated in your account."),
            )
        }
        OrderStatus::Failed => render_page(
            "error",
            "&#10007; Payment declined",
            "Please try again or choose another payment method.",
        ),
        OrderStatus::Pending => render_page(
            "pending",
            "Payment is being processed",
            "The payment status will be updated shortly.",
        ),
        OrderStatus::Created | OrderStatus::Cancelled => {
            render_page("error", "Unknown payment status", "")
        }
    }
}

/// `heading` and `body` are inserted verbatim; escape user data before passing it
fn render_page(class: &str, heading: &str, body: &str) -> String {
    let body = if body.is_empty() {
        String::new()
    } else {
        format!("\n        <p>{body}</p>")
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Payment result</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; text-align: center; }}
        .success {{ color: green; }}
        .error {{ color: red; }}
        .pending {{ color: orange; }}
    </style>
</head>
<body>
    <h1>Payment result</h1>
    <div class="{class}">
        <h2>{heading}</h2>{body}
    </div>
    <p><a href="/">Back to the shop</a></p>
</body>
</html>"#
    )
}
