//! Entry-level types: Entry, SubHeaderMarker, Member, OrderEntry

use super::ids::{EntryId, GroupId};
use serde::{Deserialize, Serialize};

/// One orderable prompt entry as the presentation layer names it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub identifier: EntryId,
    pub display_name: String,
}

impl Entry {
    /// Create a new entry
    pub fn new(identifier: impl Into<EntryId>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
        }
    }
}

/// Placeholder for a nested child group's position inside a parent's member
/// list. It does not own the child's entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubHeaderMarker {
    pub group: GroupId,
    pub name: String,
}

/// A slot in a group's ordered member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Member {
    Entry(Entry),
    SubHeader(SubHeaderMarker),
}

impl Member {
    /// Get the entry if this slot holds one
    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::SubHeader(_) => None,
        }
    }

    /// Get the entry identifier if this slot holds an entry
    pub fn identifier(&self) -> Option<&EntryId> {
        self.as_entry().map(|e| &e.identifier)
    }

    /// Check if this slot is a sub-header marker
    pub fn is_marker(&self) -> bool {
        matches!(self, Self::SubHeader(_))
    }
}

impl From<Entry> for Member {
    fn from(entry: Entry) -> Self {
        Self::Entry(entry)
    }
}

/// The engine's view of one item of the authoritative order list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub identifier: EntryId,
    pub enabled: bool,
}

impl OrderEntry {
    /// Create a new order entry
    pub fn new(identifier: impl Into<EntryId>, enabled: bool) -> Self {
        Self {
            identifier: identifier.into(),
            enabled,
        }
    }
}
