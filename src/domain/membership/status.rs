//! Membership status state machine.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Membership subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Paid up with full access.
    Active,

    /// Cancelled but still inside the grace window. Access is retained
    /// until `grace_end_date`.
    Grace,

    /// Temporarily suspended. No access until resumed.
    Paused,

    /// Ended by cancellation. Can still be reactivated.
    Cancelled,

    /// Ended by the passage of time. Final.
    Expired,
}

impl MembershipStatus {
    pub const ALL: [MembershipStatus; 5] = [
        MembershipStatus::Active,
        MembershipStatus::Grace,
        MembershipStatus::Paused,
        MembershipStatus::Cancelled,
        MembershipStatus::Expired,
    ];

    /// Returns true if memberships in this status contribute capabilities.
    pub fn grants_access(&self) -> bool {
        matches!(self, MembershipStatus::Active | MembershipStatus::Grace)
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Grace => "grace",
            MembershipStatus::Paused => "paused",
            MembershipStatus::Cancelled => "cancelled",
            MembershipStatus::Expired => "expired",
        }
    }
}

impl StateMachine for MembershipStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MembershipStatus::*;
        matches!(
            (self, target),
            // From ACTIVE
            (Active, Grace)
                | (Active, Paused)
                | (Active, Cancelled)
                | (Active, Expired)
            // From GRACE
                | (Grace, Active)
                | (Grace, Paused)
                | (Grace, Cancelled)
                | (Grace, Expired)
            // From PAUSED
                | (Paused, Active)
                | (Paused, Cancelled)
                | (Paused, Expired)
            // From CANCELLED
                | (Cancelled, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MembershipStatus::*;
        match self {
            Active => vec![Grace, Paused, Cancelled, Expired],
            Grace => vec![Active, Paused, Cancelled, Expired],
            Paused => vec![Active, Cancelled, Expired],
            Cancelled => vec![Active],
            Expired => vec![],
        }
    }

    /// Cancelled and expired are terminal even though a cancelled
    /// membership may still be reactivated.
    fn is_terminal(&self) -> bool {
        matches!(self, MembershipStatus::Cancelled | MembershipStatus::Expired)
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MembershipStatus::Active),
            "grace" => Ok(MembershipStatus::Grace),
            "paused" => Ok(MembershipStatus::Paused),
            "cancelled" => Ok(MembershipStatus::Cancelled),
            "expired" => Ok(MembershipStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown membership status '{}'", other),
            )),
        }
    }
}
