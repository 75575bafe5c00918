//! Event sink that writes every event to the log.

use async_trait::async_trait;

use crate::domain::{DomainEvent, EventEnvelope};
use crate::ports::EventSink;

/// Audit trail via `tracing`. Used by the binary when no other listener is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: DomainEvent) {
        let envelope = EventEnvelope::wrap(event);
        let payload = serde_json::to_string(&envelope.payload)
            .unwrap_or_else(|err| format!("<unserializable: {}>", err));
        tracing::info!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            aggregate_type = %envelope.aggregate_type,
            aggregate_id = %envelope.aggregate_id,
            payload = %payload,
            "Domain event"
        );
    }
}
