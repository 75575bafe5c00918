//! Membership levels and member identities as seen by the lifecycle.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LevelId, UserId};

use super::{Capability, CapabilitySet};

/// A plan users subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    /// Extra capabilities granted on top of the base `level_<id>` tag.
    pub custom_capabilities: Vec<Capability>,
}

impl Level {
    pub fn new(id: LevelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            custom_capabilities: Vec::new(),
        }
    }

    /// Adds custom capabilities from raw configured names. Unusable names
    /// are dropped.
    pub fn with_custom_capabilities<'a>(mut self, raw: impl IntoIterator<Item = &'a str>) -> Self {
        self.custom_capabilities
            .extend(raw.into_iter().filter_map(Capability::custom));
        self
    }

    /// Everything a member of this level is granted.
    pub fn capabilities(&self) -> CapabilitySet {
        let mut set: CapabilitySet = self.custom_capabilities.iter().cloned().collect();
        set.insert(Capability::for_level(self.id));
        set
    }
}

/// The user record fields shown alongside memberships and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberIdentity {
    pub user_id: UserId,
    pub login: String,
    pub email: String,
    pub display_name: String,
}
