//! Membership aggregate entity.
//!
//! A membership is one subscription a user holds in one level. Several rows
//! may exist for the same (user, level) pair over time; the most recently
//! created one is current.
//!
//! # Invariants
//!
//! - `grace_end_date` is set only while status is `grace`
//! - `paused_at` / `pause_until` are set only while status is `paused`
//! - `version` increases by one on every persisted update

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LevelId, MembershipId, StateMachine, Timestamp, UserId};

use super::{BillingTerms, MembershipError, MembershipStatus, TermsUpdate};

/// A membership row as held by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub level_id: LevelId,
    pub status: MembershipStatus,
    pub status_reason: Option<String>,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub grace_end_date: Option<Timestamp>,
    pub paused_at: Option<Timestamp>,
    pub pause_until: Option<Timestamp>,
    pub billing: BillingTerms,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Optimistic-lock counter checked by the repository on update.
    pub version: i64,
}

/// A membership that has not been stored yet. Storage assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    pub user_id: UserId,
    pub level_id: LevelId,
    pub status_reason: Option<String>,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub billing: BillingTerms,
    pub created_at: Timestamp,
}

impl NewMembership {
    /// Draft of a freshly assigned, active membership.
    pub fn active(user_id: UserId, level_id: LevelId, now: Timestamp) -> Self {
        Self {
            user_id,
            level_id,
            status_reason: None,
            start_date: now,
            end_date: None,
            billing: BillingTerms::default(),
            created_at: now,
        }
    }

    /// Materializes the row once storage has chosen an id.
    pub fn into_membership(self, id: MembershipId) -> Membership {
        Membership {
            id,
            user_id: self.user_id,
            level_id: self.level_id,
            status: MembershipStatus::Active,
            status_reason: self.status_reason,
            start_date: self.start_date,
            end_date: self.end_date,
            grace_end_date: None,
            paused_at: None,
            pause_until: None,
            billing: self.billing,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 1,
        }
    }
}

impl Membership {
    /// True when this row should contribute capabilities at `now`.
    pub fn grants_capabilities(&self, now: Timestamp) -> bool {
        self.status.grants_access() && self.end_date.map_or(true, |end| end.is_after(&now))
    }

    /// True when the row is past its end date but not yet closed out.
    pub fn is_due_for_expiry(&self, now: Timestamp) -> bool {
        !self.status.is_terminal() && self.end_date.map_or(false, |end| !end.is_after(&now))
    }

    /// Checks the field invariants that depend on status.
    pub fn invariants_hold(&self) -> bool {
        let grace_ok = (self.status == MembershipStatus::Grace) == self.grace_end_date.is_some();
        let pause_ok = self.status == MembershipStatus::Paused || self.paused_at.is_none();
        let pause_until_ok = self.status == MembershipStatus::Paused || self.pause_until.is_none();
        grace_ok && pause_ok && pause_until_ok
    }

    /// Refreshes billing terms and end date on an already-active row.
    pub fn renew(&mut self, billing: Option<BillingTerms>, end_date: Option<Timestamp>, now: Timestamp) {
        if let Some(terms) = billing {
            self.billing = terms;
        }
        if end_date.is_some() {
            self.end_date = end_date;
        }
        self.updated_at = now;
    }

    /// Applies terms reported by the gateway. Only an active row takes them.
    pub fn update_terms(&mut self, update: &TermsUpdate, now: Timestamp) -> Result<(), MembershipError> {
        if self.status != MembershipStatus::Active {
            return Err(MembershipError::invalid_transition(
                self.id,
                self.status,
                MembershipStatus::Active,
            ));
        }
        update.apply_to(&mut self.billing);
        if update.end_date.is_some() {
            self.end_date = update.end_date;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Cancels the membership.
    ///
    /// With `grace_days > 0` an active membership enters grace and keeps its
    /// access until `now + grace_days`. Anything else, including a membership
    /// already in grace, is cancelled outright with `end_date = now`.
    pub fn cancel(
        &mut self,
        now: Timestamp,
        grace_days: u32,
        reason: Option<String>,
    ) -> Result<(), MembershipError> {
        let target = if self.status == MembershipStatus::Active && grace_days > 0 {
            MembershipStatus::Grace
        } else {
            MembershipStatus::Cancelled
        };
        self.transition_to(target)?;

        match target {
            MembershipStatus::Grace => {
                let grace_end = now.add_days(i64::from(grace_days));
                self.end_date = Some(grace_end);
                self.grace_end_date = Some(grace_end);
            }
            _ => {
                self.end_date = Some(now);
                self.grace_end_date = None;
            }
        }
        self.paused_at = None;
        self.pause_until = None;
        self.status_reason = reason;
        self.updated_at = now;
        Ok(())
    }

    /// Brings a cancelled or grace membership back to active.
    pub fn reactivate(&mut self, now: Timestamp) -> Result<(), MembershipError> {
        if !matches!(self.status, MembershipStatus::Cancelled | MembershipStatus::Grace) {
            return Err(MembershipError::invalid_transition(
                self.id,
                self.status,
                MembershipStatus::Active,
            ));
        }
        self.transition_to(MembershipStatus::Active)?;
        self.end_date = None;
        self.grace_end_date = None;
        self.status_reason = None;
        self.updated_at = now;
        Ok(())
    }

    /// Suspends access. `until = None` pauses indefinitely.
    pub fn pause(
        &mut self,
        now: Timestamp,
        until: Option<Timestamp>,
        reason: Option<String>,
    ) -> Result<(), MembershipError> {
        if let Some(until) = until {
            if !until.is_after(&now) {
                return Err(MembershipError::validation(
                    "pause_until",
                    "must be in the future",
                ));
            }
        }
        self.transition_to(MembershipStatus::Paused)?;
        self.paused_at = Some(now);
        self.pause_until = until;
        self.grace_end_date = None;
        self.status_reason = reason;
        self.updated_at = now;
        Ok(())
    }

    /// Ends a pause and restores access.
    pub fn resume(&mut self, now: Timestamp, reason: Option<String>) -> Result<(), MembershipError> {
        if self.status != MembershipStatus::Paused {
            return Err(MembershipError::invalid_transition(
                self.id,
                self.status,
                MembershipStatus::Active,
            ));
        }
        self.transition_to(MembershipStatus::Active)?;
        self.paused_at = None;
        self.pause_until = None;
        self.status_reason = reason;
        self.updated_at = now;
        Ok(())
    }

    /// Forces the membership to expired.
    ///
    /// Returns `false` without touching anything when the membership is
    /// already cancelled or expired.
    pub fn expire(&mut self, now: Timestamp) -> Result<bool, MembershipError> {
        if self.status.is_terminal() {
            return Ok(false);
        }
        self.transition_to(MembershipStatus::Expired)?;
        self.end_date = Some(self.end_date.filter(|end| !end.is_after(&now)).unwrap_or(now));
        self.grace_end_date = None;
        self.paused_at = None;
        self.pause_until = None;
        self.updated_at = now;
        Ok(true)
    }

    fn transition_to(&mut self, target: MembershipStatus) -> Result<(), MembershipError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| MembershipError::invalid_transition(self.id, self.status, target))?;
        Ok(())
    }
}
