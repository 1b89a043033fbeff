//! Core types for the prompt groups engine

mod entry;
mod group;
mod ids;

// Re-export all types
pub use entry::{Entry, Member, OrderEntry, SubHeaderMarker};
pub use group::{Counts, Group, GroupKind};
pub use ids::{EntryId, GroupId, ToggleTicket};
