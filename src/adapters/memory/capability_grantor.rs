//! In-memory capability grants.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::{Capability, CapabilitySet};
use crate::ports::CapabilityGrantor;

#[derive(Default)]
pub struct InMemoryCapabilityGrantor {
    grants: RwLock<HashMap<UserId, CapabilitySet>>,
}

impl InMemoryCapabilityGrantor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a user's capabilities.
    pub async fn capabilities_of(&self, user_id: &UserId) -> CapabilitySet {
        self.grants
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn has(&self, user_id: &UserId, capability: &str) -> bool {
        self.capabilities_of(user_id)
            .await
            .iter()
            .any(|c| c.as_str() == capability)
    }
}

#[async_trait]
impl CapabilityGrantor for InMemoryCapabilityGrantor {
    async fn granted(&self, user_id: &UserId) -> Result<CapabilitySet, DomainError> {
        Ok(self.capabilities_of(user_id).await)
    }

    async fn grant(&self, user_id: &UserId, capability: &Capability) -> Result<(), DomainError> {
        self.grants
            .write()
            .await
            .entry(*user_id)
            .or_default()
            .insert(capability.clone());
        Ok(())
    }

    async fn revoke(&self, user_id: &UserId, capability: &Capability) -> Result<(), DomainError> {
        if let Some(set) = self.grants.write().await.get_mut(user_id) {
            set.remove(capability);
        }
        Ok(())
    }
}
