//! Capability grantor port - access tags on user records.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::{Capability, CapabilitySet};

/// Grants and revokes capabilities on a user record.
///
/// Only tags this engine granted are reported by `granted`, so reconciling
/// never strips capabilities that came from somewhere else. Both `grant`
/// and `revoke` are idempotent.
#[async_trait]
pub trait CapabilityGrantor: Send + Sync {
    async fn granted(&self, user_id: &UserId) -> Result<CapabilitySet, DomainError>;

    async fn grant(&self, user_id: &UserId, capability: &Capability) -> Result<(), DomainError>;

    async fn revoke(&self, user_id: &UserId, capability: &Capability) -> Result<(), DomainError>;
}
