//! Membership domain events.
//!
//! Raised after the row write commits, one per successful lifecycle
//! operation. Named in past tense.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LevelId, MembershipId, Timestamp, UserId};

use super::MembershipStatus;

/// Events that occur during the membership lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MembershipEvent {
    /// A new membership row was created in `active`.
    Assigned {
        membership_id: MembershipId,
        user_id: UserId,
        level_id: LevelId,
        occurred_at: Timestamp,
    },

    /// A membership moved between states.
    StatusChanged {
        membership_id: MembershipId,
        user_id: UserId,
        level_id: LevelId,
        from: MembershipStatus,
        to: MembershipStatus,
        reason: Option<String>,
        occurred_at: Timestamp,
    },

    /// A membership row was removed.
    Deleted {
        membership_id: MembershipId,
        user_id: UserId,
        level_id: LevelId,
        occurred_at: Timestamp,
    },
}

impl MembershipEvent {
    /// Returns the event type string for routing.
    pub fn event_type(&self) -> &'static str {
        match self {
            MembershipEvent::Assigned { .. } => "membership.assigned",
            MembershipEvent::StatusChanged { .. } => "membership.status_changed",
            MembershipEvent::Deleted { .. } => "membership.deleted",
        }
    }

    pub fn membership_id(&self) -> MembershipId {
        match self {
            MembershipEvent::Assigned { membership_id, .. }
            | MembershipEvent::StatusChanged { membership_id, .. }
            | MembershipEvent::Deleted { membership_id, .. } => *membership_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            MembershipEvent::Assigned { user_id, .. }
            | MembershipEvent::StatusChanged { user_id, .. }
            | MembershipEvent::Deleted { user_id, .. } => *user_id,
        }
    }
}
