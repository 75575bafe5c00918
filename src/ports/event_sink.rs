//! Event sink port - fire-and-observe delivery of domain events.
//!
//! Called synchronously after the state change it describes has committed.
//! Listener failures are the sink's problem: `publish` cannot fail the
//! operation that raised the event.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::{DomainEvent, EventEnvelope};

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}

/// An observer attached to a sink, e.g. an audit writer or notifier.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Name used in logs when the listener fails.
    fn name(&self) -> &'static str;

    /// Event types this listener wants. Empty means all.
    fn event_types(&self) -> &[&'static str] {
        &[]
    }

    async fn on_event(&self, envelope: &EventEnvelope) -> Result<(), DomainError>;
}
