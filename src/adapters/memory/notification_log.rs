//! In-memory notification markers.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, MembershipId, Timestamp, UserId};
use crate::ports::{NotificationKind, NotificationLog};

type MarkerKey = (UserId, MembershipId, NotificationKind);

#[derive(Default)]
pub struct InMemoryNotificationLog {
    markers: RwLock<HashMap<MarkerKey, Timestamp>>,
}

impl InMemoryNotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn marker_count(&self) -> usize {
        self.markers.read().await.len()
    }
}

#[async_trait]
impl NotificationLog for InMemoryNotificationLog {
    async fn was_notified(
        &self,
        user_id: &UserId,
        membership_id: &MembershipId,
        kind: NotificationKind,
    ) -> Result<bool, DomainError> {
        Ok(self
            .markers
            .read()
            .await
            .contains_key(&(*user_id, *membership_id, kind)))
    }

    async fn mark_notified(
        &self,
        user_id: &UserId,
        membership_id: &MembershipId,
        kind: NotificationKind,
        at: &Timestamp,
    ) -> Result<(), DomainError> {
        self.markers
            .write()
            .await
            .entry((*user_id, *membership_id, kind))
            .or_insert(*at);
        Ok(())
    }
}
