//! In-memory membership storage.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, LevelId, MembershipId, Timestamp, UserId};
use crate::domain::membership::{Membership, MembershipStatus, NewMembership};
use crate::ports::MembershipRepository;

#[derive(Default)]
struct State {
    rows: BTreeMap<MembershipId, Membership>,
    next_id: i64,
}

/// Rows kept in id order, so "most recently created" is "highest id".
#[derive(Default)]
pub struct InMemoryMembershipRepository {
    state: RwLock<State>,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, in any status.
    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Overwrites a row without a version check. Lets tests set up end
    /// dates and states directly.
    pub async fn put(&self, membership: Membership) {
        let mut state = self.state.write().await;
        state.next_id = state.next_id.max(membership.id.as_i64());
        state.rows.insert(membership.id, membership);
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn insert(&self, draft: NewMembership) -> Result<Membership, DomainError> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = MembershipId::new(state.next_id)?;
        let membership = draft.into_membership(id);
        state.rows.insert(id, membership.clone());
        Ok(membership)
    }

    async fn update(&self, membership: &Membership) -> Result<Membership, DomainError> {
        let mut state = self.state.write().await;
        let stored = state.rows.get_mut(&membership.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::MembershipNotFound,
                format!("Membership {} not found", membership.id),
            )
        })?;

        if stored.version != membership.version {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Membership {} was modified concurrently (expected version {}, found {})",
                    membership.id, membership.version, stored.version
                ),
            )
            .with_detail("membership_id", membership.id.to_string()));
        }

        let mut updated = membership.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError> {
        Ok(self.state.read().await.rows.get(id).cloned())
    }

    async fn find_current(
        &self,
        user_id: &UserId,
        level_id: &LevelId,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .rows
            .values()
            .rev()
            .find(|m| m.user_id == *user_id && m.level_id == *level_id)
            .cloned())
    }

    async fn find_many(&self, ids: &[MembershipId]) -> Result<Vec<Membership>, DomainError> {
        let state = self.state.read().await;
        let mut found: Vec<Membership> = ids
            .iter()
            .filter_map(|id| state.rows.get(id).cloned())
            .collect();
        found.sort_by_key(|m| m.id);
        found.dedup_by_key(|m| m.id);
        Ok(found)
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .rows
            .values()
            .filter(|m| m.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn find_due_for_expiry(&self, now: &Timestamp) -> Result<Vec<Membership>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .rows
            .values()
            .filter(|m| m.is_due_for_expiry(*now))
            .cloned()
            .collect())
    }

    async fn find_ending_between(
        &self,
        from: &Timestamp,
        to: &Timestamp,
    ) -> Result<Vec<Membership>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .rows
            .values()
            .filter(|m| matches!(m.status, MembershipStatus::Active | MembershipStatus::Grace))
            .filter(|m| m.end_date.map_or(false, |end| end > *from && end <= *to))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &MembershipId) -> Result<bool, DomainError> {
        Ok(self.state.write().await.rows.remove(id).is_some())
    }
}
