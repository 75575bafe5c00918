//! Notification log port - "already notified" markers for the sweep.

use async_trait::async_trait;
use std::fmt;

use crate::domain::foundation::{DomainError, MembershipId, Timestamp, UserId};

/// Which lifecycle email a marker stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Expiring,
    Expired,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Expiring => "expiring",
            NotificationKind::Expired => "expired",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markers keyed by (user, membership, kind).
#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn was_notified(
        &self,
        user_id: &UserId,
        membership_id: &MembershipId,
        kind: NotificationKind,
    ) -> Result<bool, DomainError>;

    /// Sets the marker. Setting an existing marker is a no-op.
    async fn mark_notified(
        &self,
        user_id: &UserId,
        membership_id: &MembershipId,
        kind: NotificationKind,
        at: &Timestamp,
    ) -> Result<(), DomainError>;
}
