//! IdempotencyService - at-most-once bookkeeping for gateway notifications.
//!
//! Callers check `has_processed` before applying any effect and call
//! `mark_processed` only once the effect is durable. A crash in between
//! means the gateway's redelivery is processed again instead of lost.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::{Clock, DomainError, Timestamp};
use crate::domain::gateway::GatewayKind;
use crate::ports::{ProcessedEvent, ProcessedEventStore, SaveResult};

pub struct IdempotencyService {
    store: Arc<dyn ProcessedEventStore>,
    clock: Arc<dyn Clock>,
}

impl IdempotencyService {
    pub fn new(store: Arc<dyn ProcessedEventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Existence check only. Never writes.
    pub async fn has_processed(&self, event_id: &str) -> Result<bool, DomainError> {
        self.store.exists(event_id).await
    }

    /// Records an event. A second call for the same id is a no-op that
    /// reports `AlreadyExists`.
    pub async fn mark_processed(
        &self,
        event_id: &str,
        gateway: GatewayKind,
        metadata: Value,
    ) -> Result<SaveResult, DomainError> {
        let result = self
            .store
            .insert_if_absent(ProcessedEvent {
                event_id: event_id.to_string(),
                gateway: gateway.clone(),
                metadata,
                processed_at: self.clock.now(),
            })
            .await?;

        match result {
            SaveResult::Inserted => {
                tracing::debug!(event_id, gateway = %gateway, "Event marked processed")
            }
            SaveResult::AlreadyExists => {
                tracing::debug!(event_id, gateway = %gateway, "Event already marked processed")
            }
        }
        Ok(result)
    }

    pub async fn get_processed_event(
        &self,
        event_id: &str,
    ) -> Result<Option<ProcessedEvent>, DomainError> {
        self.store.find(event_id).await
    }

    /// Deletes records older than `retention_days`. Returns how many went.
    pub async fn cleanup(&self, retention_days: u32) -> Result<u64, DomainError> {
        let cutoff: Timestamp = self.clock.now().minus_days(i64::from(retention_days));
        let deleted = self.store.delete_before(&cutoff).await?;
        if deleted > 0 {
            tracing::info!(deleted, retention_days, "Processed events cleaned up");
        }
        Ok(deleted)
    }
}
