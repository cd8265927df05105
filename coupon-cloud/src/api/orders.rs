//! Order creation and status

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use shared::error::AppError;
use shared::models::from_minor_units;
use shared::payment::{CreateOrderRequest, CreateOrderResponse, OrderStatusResponse};

use crate::error::ApiResult;
use crate::orders::StatusReport;
use crate::state::AppState;

/// POST /api/orders - create an order and get the payment form URL
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<Json<CreateOrderResponse>> {
    let Json(req) = payload.map_err(|e| AppError::invalid_request(e.body_text()))?;

    let outcome = state.orders.create_order(&req).await?;
    let created = outcome.value;
    if !outcome.warnings.is_empty() {
        tracing::warn!(
            order_number = %created.order_number,
            warnings = outcome.warnings.len(),
            "Order created with warnings"
        );
    }

    Ok(Json(CreateOrderResponse {
        order_id: created.order_id,
        order_number: created.order_number,
        payment_url: created.payment_url,
        success: true,
        message: note_warnings(
            Some("Order created successfully".to_string()),
            &outcome.warnings,
        ),
    }))
}

/// GET /api/orders/{order_number}/status - reconcile with the gateway
pub async fn status(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ApiResult<Json<OrderStatusResponse>> {
    let outcome = state.orders.check_order_status(&order_number).await?;
    if !outcome.warnings.is_empty() {
        tracing::warn!(
            order_number = %outcome.value.order_number,
            warnings = outcome.warnings.len(),
            "Status check completed with warnings"
        );
    }
    let mut response = status_response(outcome.value);
    response.message = note_warnings(response.message, &outcome.warnings);
    Ok(Json(response))
}

/// Append the number of non-fatal problems to a response message
fn note_warnings(message: Option<String>, warnings: &[String]) -> Option<String> {
    if warnings.is_empty() {
        return message;
    }
    let note = format!(
        "{} warning(s) while recording the result, it will be reconciled on the next status check",
        warnings.len()
    );
    Some(match message {
        Some(message) => format!("{message}; {note}"),
        None => note,
    })
}

pub(crate) fn status_response(report: StatusReport) -> OrderStatusResponse {
    OrderStatusResponse {
        order_id: report.order_id,
        order_number: report.order_number,
        status: report.status,
        coupon_name: report.coupon_name,
        amount: from_minor_units(report.amount),
        currency: report.currency,
        success: true,
        message: report.advisory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_warnings() {
        assert_eq!(note_warnings(None, &[]), None);
        assert_eq!(
            note_warnings(Some("ok".into()), &[]).as_deref(),
            Some("ok")
        );

        let warnings = vec!["a".to_string(), "b".to_string()];
        let message = note_warnings(Some("Order created successfully".into()), &warnings).unwrap();
        assert!(message.starts_with("Order created successfully; 2 warning(s)"));

        let message = note_warnings(None, &warnings[..1]).unwrap();
        assert!(message.starts_with("1 warning(s)"));
    }
}
