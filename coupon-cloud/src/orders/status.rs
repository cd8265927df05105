//! Gateway status code → local order status

use shared::models::OrderStatus;

use crate::gateway::status_code;

/// What a status check should do with the stored order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDecision {
    /// Stored status already matches the gateway
    Keep,
    /// Move from the stored status to this one
    Move(OrderStatus),
    /// Code with no local meaning; nothing changes
    Unknown(i32),
    /// Stored status is terminal but the gateway reports something else
    Frozen { reported: OrderStatus },
}

/// Local status for the gateway codes we act on
pub fn map_gateway_status(code: i32) -> Option<OrderStatus> {
    match code {
        status_code::IN_PROGRESS => Some(OrderStatus::Pending),
        status_code::PAID => Some(OrderStatus::Paid),
        status_code::DECLINED => Some(OrderStatus::Failed),
        _ => None,
    }
}

/// Decide the transition for an order currently in `current`
///
/// Only non-terminal orders move. A `created` order is reconciled like
/// `pending` (it only reaches a status check once it has a gateway id).
pub fn resolve(current: OrderStatus, code: i32) -> StatusDecision {
    let Some(mapped) = map_gateway_status(code) else {
        return StatusDecision::Unknown(code);
    };
    if mapped == current {
        StatusDecision::Keep
    } else if current.is_terminal() {
        StatusDecision::Frozen { reported: mapped }
    } else {
        StatusDecision::Move(mapped)
    }
}
