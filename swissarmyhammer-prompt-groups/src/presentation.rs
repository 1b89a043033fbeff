//! Presentation layer seam
//!
//! The engine reads what the visual layer currently shows through
//! [`PresentationLayer::elements`] and pushes visual side effects back through
//! the remaining methods. Every side effect has a no-op default so a host only
//! implements the ones it renders.

use crate::types::{Counts, EntryId, GroupId, Member};

/// One element the presentation layer currently shows inside a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentedElement {
    /// A member element. Elements without an identifier are skipped.
    Entry {
        identifier: Option<String>,
        display_name: String,
    },
    /// A nested child group rendered inside this group
    ChildGroup(GroupId),
}

impl PresentedElement {
    /// Member element with an identifier
    pub fn entry(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::Entry {
            identifier: Some(identifier.into()),
            display_name: display_name.into(),
        }
    }
}

/// The transient visual layer
pub trait PresentationLayer {
    /// Elements currently rendered for a group, in visual order
    fn elements(&self, group: &GroupId) -> Vec<PresentedElement>;

    /// Publish a group's aggregated counter
    fn publish_counts(&mut self, _group: &GroupId, _counts: Counts) {}

    /// Hide or show a group's inline members
    fn set_members_hidden(&mut self, _group: &GroupId, _hidden: bool) {}

    /// Attach the tray open/close trigger to a group header
    fn attach_tray_trigger(&mut self, _group: &GroupId) {}

    /// Detach the tray open/close trigger
    fn detach_tray_trigger(&mut self, _group: &GroupId) {}

    /// Attach inline reorder handling for accordion mode
    fn attach_reorder_handler(&mut self, _group: &GroupId) {}

    /// Detach inline reorder handling
    fn detach_reorder_handler(&mut self, _group: &GroupId) {}

    /// Expand or collapse an accordion group in place
    fn set_expanded(&mut self, _group: &GroupId, _expanded: bool) {}

    /// Render the tray overlay for a group with its flattened members
    fn open_overlay(&mut self, _group: &GroupId, _members: &[Member]) {}

    /// Remove the tray overlay
    fn close_overlay(&mut self, _group: &GroupId) {}

    /// Show or hide the promotion zone
    fn set_promotion_zone_visible(&mut self, _visible: bool) {}

    /// Highlight a group header as the current drop target (`None` clears)
    fn highlight_drop_target(&mut self, _group: Option<&GroupId>) {}

    /// Open the context menu for an entry
    fn open_context_menu(&mut self, _entry: &EntryId) {}

    /// Close the context menu
    fn close_context_menu(&mut self) {}
}
