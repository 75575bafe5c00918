//! ProcessedEventStore port - durable record of handled gateway notifications.
//!
//! Gateways redeliver webhooks on timeouts and non-2xx responses, so every
//! handler checks this store before acting and records the event after its
//! effects are durable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::gateway::GatewayKind;

/// Idempotency record for one inbound notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub gateway: GatewayKind,
    /// Opaque key/value payload, e.g. `{"type": "charge.refunded"}`.
    pub metadata: Value,
    pub processed_at: Timestamp,
}

/// Result of attempting to record an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time this event id was recorded.
    Inserted,
    /// Another caller recorded it first. Nothing was written.
    AlreadyExists,
}

/// Implementations must make `insert_if_absent` atomic (a primary key on
/// `event_id` with `ON CONFLICT DO NOTHING`, or equivalent).
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError>;

    async fn insert_if_absent(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError>;

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError>;

    /// Deletes records processed strictly before `cutoff`. Returns the count.
    async fn delete_before(&self, cutoff: &Timestamp) -> Result<u64, DomainError>;
}
