//! Grace period policy port.

use crate::domain::membership::Membership;

/// Decides how many grace days a cancellation gets. Zero cancels outright.
pub trait GracePeriodPolicy: Send + Sync {
    fn grace_days(&self, membership: &Membership, reason: Option<&str>) -> u32;
}

/// Same number of grace days for every cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedGracePolicy {
    days: u32,
}

impl FixedGracePolicy {
    pub fn new(days: u32) -> Self {
        Self { days }
    }

    /// No grace: cancellations take effect immediately.
    pub fn none() -> Self {
        Self { days: 0 }
    }
}

impl GracePeriodPolicy for FixedGracePolicy {
    fn grace_days(&self, _membership: &Membership, _reason: Option<&str>) -> u32 {
        self.days
    }
}
