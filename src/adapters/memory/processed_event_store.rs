//! In-memory idempotency store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{ProcessedEvent, ProcessedEventStore, SaveResult};

/// The write lock makes check-and-insert atomic.
#[derive(Default)]
pub struct InMemoryProcessedEventStore {
    events: RwLock<HashMap<String, ProcessedEvent>>,
}

impl InMemoryProcessedEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        Ok(self.events.read().await.contains_key(event_id))
    }

    async fn insert_if_absent(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.event_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        events.insert(event.event_id.clone(), event);
        Ok(SaveResult::Inserted)
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError> {
        Ok(self.events.read().await.get(event_id).cloned())
    }

    async fn delete_before(&self, cutoff: &Timestamp) -> Result<u64, DomainError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|_, e| !e.processed_at.is_before(cutoff));
        Ok((before - events.len()) as u64)
    }
}
