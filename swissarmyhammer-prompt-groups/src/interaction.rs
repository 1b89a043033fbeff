//! Owned interaction slots
//!
//! At most one drag session, one open overlay and one context menu exist at
//! a time. Each lives in its own slot; replacing a slot hands back the
//! previous occupant so the caller can tear it down.

use crate::types::{EntryId, GroupId};
use serde::Serialize;

/// Holds at most one active interaction of type `T`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionSlot<T> {
    current: Option<T>,
}

impl<T> Default for InteractionSlot<T> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<T> InteractionSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `value`, returning whatever it displaced
    pub fn replace(&mut self, value: T) -> Option<T> {
        self.current.replace(value)
    }

    /// Empty the slot, returning the previous occupant
    pub fn clear(&mut self) -> Option<T> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut T> {
        self.current.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

/// An open context menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextMenu {
    pub entry: EntryId,
    /// Group the entry currently belongs to, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}
