//! Domain events as delivered to event sinks.

use serde::{Deserialize, Serialize};

use super::foundation::{EventId, Timestamp};
use super::membership::MembershipEvent;
use super::order::OrderEvent;

/// Everything the engine announces to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Membership(MembershipEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// Returns the event type string (e.g. "order.refund_succeeded").
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::Membership(e) => e.event_type(),
            DomainEvent::Order(e) => e.event_type(),
        }
    }

    pub fn aggregate_type(&self) -> &'static str {
        match self {
            DomainEvent::Membership(_) => "Membership",
            DomainEvent::Order(_) => "Order",
        }
    }

    pub fn aggregate_id(&self) -> String {
        match self {
            DomainEvent::Membership(e) => e.membership_id().to_string(),
            DomainEvent::Order(e) => e.order_id().to_string(),
        }
    }

    pub fn occurred_at(&self) -> Timestamp {
        match self {
            DomainEvent::Membership(
                MembershipEvent::Assigned { occurred_at, .. }
                | MembershipEvent::StatusChanged { occurred_at, .. }
                | MembershipEvent::Deleted { occurred_at, .. },
            )
            | DomainEvent::Order(
                OrderEvent::RefundSucceeded { occurred_at, .. }
                | OrderEvent::RefundFailed { occurred_at, .. },
            ) => *occurred_at,
        }
    }
}

impl From<MembershipEvent> for DomainEvent {
    fn from(event: MembershipEvent) -> Self {
        DomainEvent::Membership(event)
    }
}

impl From<OrderEvent> for DomainEvent {
    fn from(event: OrderEvent) -> Self {
        DomainEvent::Order(event)
    }
}

/// Transport wrapper carrying routing fields next to the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub occurred_at: Timestamp,
    pub payload: DomainEvent,
}

impl EventEnvelope {
    /// Wraps an event under a fresh id.
    pub fn wrap(event: DomainEvent) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event.event_type().to_string(),
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_string(),
            occurred_at: event.occurred_at(),
            payload: event,
        }
    }
}
