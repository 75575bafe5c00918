//! Membership repository port.
//!
//! Storage contract for membership rows. Several rows may exist for one
//! (user, level) pair; `find_current` returns the most recently created.
//!
//! # Concurrency
//!
//! `update` is a compare-and-swap on `version`: the write succeeds only if
//! the stored version still equals the version the caller read, and the
//! stored version is then incremented. A stale write fails with
//! `ErrorCode::ConcurrentModification` and changes nothing.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, LevelId, MembershipId, Timestamp, UserId};
use crate::domain::membership::{Membership, NewMembership};

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Inserts a new row and returns it with its assigned id.
    async fn insert(&self, draft: NewMembership) -> Result<Membership, DomainError>;

    /// Writes a modified row guarded by its version.
    ///
    /// # Errors
    ///
    /// - `MembershipNotFound` if the row no longer exists
    /// - `ConcurrentModification` if the stored version moved on
    /// - `DatabaseError` on persistence failure
    async fn update(&self, membership: &Membership) -> Result<Membership, DomainError>;

    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError>;

    /// The authoritative row for a (user, level) pair.
    async fn find_current(
        &self,
        user_id: &UserId,
        level_id: &LevelId,
    ) -> Result<Option<Membership>, DomainError>;

    /// Rows for the given ids, in id order. Missing ids are skipped.
    async fn find_many(&self, ids: &[MembershipId]) -> Result<Vec<Membership>, DomainError>;

    /// Every row a user holds, in any status.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError>;

    /// Rows with `end_date <= now` that are not cancelled or expired.
    async fn find_due_for_expiry(&self, now: &Timestamp) -> Result<Vec<Membership>, DomainError>;

    /// Active or grace rows with `from < end_date <= to`.
    async fn find_ending_between(
        &self,
        from: &Timestamp,
        to: &Timestamp,
    ) -> Result<Vec<Membership>, DomainError>;

    /// Removes a row. Returns `false` if it did not exist.
    async fn delete(&self, id: &MembershipId) -> Result<bool, DomainError>;
}
