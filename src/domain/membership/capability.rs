//! Access capability tags granted to user records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::foundation::LevelId;

/// An access-control tag on a user record.
///
/// Tags are lowercase and limited to `[a-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

/// Ordered set of capabilities, so diffs and logs are stable.
pub type CapabilitySet = BTreeSet<Capability>;

impl Capability {
    /// The base tag every member of a level receives: `level_<id>`.
    pub fn for_level(level_id: LevelId) -> Self {
        Self(format!("level_{}", level_id))
    }

    /// Sanitizes a configured capability name. Returns `None` when nothing
    /// usable remains.
    pub fn custom(raw: &str) -> Option<Self> {
        let tag: String = raw
            .trim()
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if tag.is_empty() {
            None
        } else {
            Some(Self(tag))
        }
    }

    /// Wraps a tag read back from storage. Already sanitized on write.
    pub fn from_stored(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_capability_uses_level_prefix() {
        let level = LevelId::new(7).unwrap();
        assert_eq!(Capability::for_level(level).as_str(), "level_7");
    }

    #[test]
    fn custom_capability_is_sanitized() {
        assert_eq!(
            Capability::custom("  Premium Forum!").unwrap().as_str(),
            "premiumforum"
        );
        assert_eq!(Capability::custom("read_reports").unwrap().as_str(), "read_reports");
    }

    #[test]
    fn custom_capability_rejects_empty_result() {
        assert!(Capability::custom("   ").is_none());
        assert!(Capability::custom("!!!").is_none());
    }
}
