//! Append-only order notes.

use serde::{Deserialize, Serialize};

/// Separator placed between note entries.
pub const NOTE_SEPARATOR: &str = "\n\n";

/// Audit notes on an order. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNotes(Option<String>);

impl OrderNotes {
    pub fn empty() -> Self {
        Self(None)
    }

    /// Wraps stored text. Blank text counts as no notes.
    pub fn from_stored(text: Option<String>) -> Self {
        Self(text.filter(|t| !t.trim().is_empty()))
    }

    /// Returns a copy with `entry` appended after a blank line.
    pub fn append(&self, entry: &str) -> Self {
        match &self.0 {
            Some(existing) => Self(Some(format!("{}{}{}", existing, NOTE_SEPARATOR, entry))),
            None => Self(Some(entry.to_string())),
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn into_inner(self) -> Option<String> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Number of entries recorded so far.
    pub fn entry_count(&self) -> usize {
        self.0
            .as_deref()
            .map_or(0, |text| text.split(NOTE_SEPARATOR).count())
    }
}
