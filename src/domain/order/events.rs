//! Refund reconciliation events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, OrderId, Timestamp};
use crate::domain::gateway::GatewayResult;

/// Raised once per refund attempt, after any note write has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    RefundSucceeded {
        order_id: OrderId,
        refund_id: String,
        amount: Money,
        reason: Option<String>,
        occurred_at: Timestamp,
    },
    RefundFailed {
        order_id: OrderId,
        result: GatewayResult,
        occurred_at: Timestamp,
    },
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::RefundSucceeded { .. } => "order.refund_succeeded",
            OrderEvent::RefundFailed { .. } => "order.refund_failed",
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::RefundSucceeded { order_id, .. }
            | OrderEvent::RefundFailed { order_id, .. } => *order_id,
        }
    }
}
