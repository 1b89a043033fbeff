//! Presentation mode controller
//!
//! Pure bookkeeping: which mode is active and which groups have been converted
//! to it. The engine performs discovery and the visual side effects around
//! the decisions taken here.

use crate::types::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// How groups are presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationMode {
    /// Groups are not converted at all
    #[default]
    Off,
    /// Collapsed; members shown only inside an on-demand overlay
    Tray,
    /// Expand in place; members stay present and visible
    Accordion,
}

impl fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Tray => "tray",
            Self::Accordion => "accordion",
        };
        write!(f, "{}", name)
    }
}

/// Per-group flags for the mode a group was converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupModeState {
    pub mode: PresentationMode,
    pub tray_open: bool,
    pub expanded: bool,
}

/// What entering the current mode means for one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertAction {
    /// Not converted yet: discover and set up
    Convert,
    /// Already converted but its cached membership is empty: discover again
    Rescan,
    /// Nothing to do
    Skip,
}

/// A group reverted while tearing a mode down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertedGroup {
    pub group: GroupId,
    pub state: GroupModeState,
}

/// Result of a mode-changed signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: PresentationMode,
    pub to: PresentationMode,
    /// Groups whose previous-mode setup must be undone, in no particular order
    pub reverted: Vec<RevertedGroup>,
}

impl Transition {
    /// Whether the signal re-entered the mode already active
    pub fn is_reentry(&self) -> bool {
        self.from == self.to
    }
}

/// State machine over [`PresentationMode`]
#[derive(Debug, Clone, Default)]
pub struct ModeController {
    mode: PresentationMode,
    groups: HashMap<GroupId, GroupModeState>,
    absorbed: HashSet<GroupId>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active mode
    pub fn mode(&self) -> PresentationMode {
        self.mode
    }

    /// Flags of a converted group
    pub fn state(&self, group: &GroupId) -> Option<&GroupModeState> {
        self.groups.get(group)
    }

    /// Check if a group is converted to the active mode
    pub fn is_converted(&self, group: &GroupId) -> bool {
        self.groups
            .get(group)
            .is_some_and(|s| s.mode == self.mode && self.mode != PresentationMode::Off)
    }

    /// Begin a mode change. Leaving a mode reverts every converted group;
    /// re-entering the active mode reverts nothing.
    pub fn begin_transition(&mut self, to: PresentationMode) -> Transition {
        let from = self.mode;
        if from == to {
            return Transition {
                from,
                to,
                reverted: Vec::new(),
            };
        }

        let reverted = self
            .groups
            .drain()
            .map(|(group, state)| RevertedGroup { group, state })
            .collect();
        self.mode = to;
        tracing::info!(%from, %to, "presentation mode changed");
        Transition { from, to, reverted }
    }

    /// Decide what to do for a group under the active mode
    pub fn plan(&self, group: &GroupId, has_no_entries: bool) -> ConvertAction {
        if self.mode == PresentationMode::Off || self.absorbed.contains(group) {
            return ConvertAction::Skip;
        }
        match self.groups.get(group) {
            Some(state) if state.mode == self.mode => {
                if has_no_entries {
                    ConvertAction::Rescan
                } else {
                    ConvertAction::Skip
                }
            }
            _ => ConvertAction::Convert,
        }
    }

    /// Record that a group was set up for the active mode
    pub fn mark_converted(&mut self, group: &GroupId) {
        let expanded = self.mode == PresentationMode::Accordion;
        self.groups.entry(group.clone()).or_insert(GroupModeState {
            mode: self.mode,
            tray_open: false,
            expanded,
        });
    }

    /// Revert one group to unconverted. `None` if it was not converted.
    pub fn revert(&mut self, group: &GroupId) -> Option<GroupModeState> {
        self.groups.remove(group)
    }

    /// Add groups to the set absorbed into a parent's presentation
    pub fn absorb(&mut self, groups: impl IntoIterator<Item = GroupId>) {
        self.absorbed.extend(groups);
    }

    /// Check if a group is represented inside a parent
    pub fn is_absorbed(&self, group: &GroupId) -> bool {
        self.absorbed.contains(group)
    }

    /// Forget absorption, e.g. after the group tree changed shape
    pub fn clear_absorbed(&mut self) {
        self.absorbed.clear();
    }

    /// Mark a tray open. False if the group is not a converted tray group or
    /// already open.
    pub fn open_tray(&mut self, group: &GroupId) -> bool {
        match self.groups.get_mut(group) {
            Some(state) if state.mode == PresentationMode::Tray && !state.tray_open => {
                state.tray_open = true;
                true
            }
            _ => false,
        }
    }

    /// Mark a tray closed. False (no-op) if it was not open.
    pub fn close_tray(&mut self, group: &GroupId) -> bool {
        match self.groups.get_mut(group) {
            Some(state) if state.tray_open => {
                state.tray_open = false;
                true
            }
            _ => false,
        }
    }

    /// Expand or collapse an accordion group. False if nothing changed.
    pub fn set_expanded(&mut self, group: &GroupId, expanded: bool) -> bool {
        match self.groups.get_mut(group) {
            Some(state)
                if state.mode == PresentationMode::Accordion && state.expanded != expanded =>
            {
                state.expanded = expanded;
                true
            }
            _ => false,
        }
    }

    /// Groups currently converted
    pub fn converted_groups(&self) -> Vec<GroupId> {
        self.groups.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(id: &str) -> GroupId {
        GroupId::from(id)
    }

    #[test]
    fn test_off_skips_everything() {
        let ctl = ModeController::new();
        assert_eq!(ctl.plan(&g("a"), false), ConvertAction::Skip);
    }

    #[test]
    fn test_convert_then_idempotent_reentry() {
        let mut ctl = ModeController::new();
        ctl.begin_transition(PresentationMode::Tray);
        assert_eq!(ctl.plan(&g("a"), false), ConvertAction::Convert);
        ctl.mark_converted(&g("a"));
        assert!(ctl.is_converted(&g("a")));

        let again = ctl.begin_transition(PresentationMode::Tray);
        assert!(again.is_reentry());
        assert!(again.reverted.is_empty());
        assert_eq!(ctl.plan(&g("a"), false), ConvertAction::Skip);
        assert_eq!(ctl.plan(&g("a"), true), ConvertAction::Rescan);
    }

    #[test]
    fn test_switch_reverts_previous_mode() {
        let mut ctl = ModeController::new();
        ctl.begin_transition(PresentationMode::Tray);
        ctl.mark_converted(&g("a"));
        ctl.open_tray(&g("a"));

        let transition = ctl.begin_transition(PresentationMode::Accordion);
        assert_eq!(transition.from, PresentationMode::Tray);
        assert_eq!(transition.reverted.len(), 1);
        assert!(transition.reverted[0].state.tray_open);
        assert!(!ctl.is_converted(&g("a")));
        assert_eq!(ctl.plan(&g("a"), false), ConvertAction::Convert);
    }

    #[test]
    fn test_absorbed_groups_are_skipped() {
        let mut ctl = ModeController::new();
        ctl.begin_transition(PresentationMode::Accordion);
        ctl.absorb([g("child")]);
        assert_eq!(ctl.plan(&g("child"), false), ConvertAction::Skip);
        ctl.clear_absorbed();
        assert_eq!(ctl.plan(&g("child"), false), ConvertAction::Convert);
    }

    #[test]
    fn test_tray_open_close_idempotent() {
        let mut ctl = ModeController::new();
        ctl.begin_transition(PresentationMode::Tray);
        ctl.mark_converted(&g("a"));

        assert!(!ctl.close_tray(&g("a")));
        assert!(ctl.open_tray(&g("a")));
        assert!(!ctl.open_tray(&g("a")));
        assert!(ctl.close_tray(&g("a")));
        assert!(!ctl.close_tray(&g("a")));
        assert!(!ctl.close_tray(&g("never-converted")));
    }

    #[test]
    fn test_accordion_expand_collapse() {
        let mut ctl = ModeController::new();
        ctl.begin_transition(PresentationMode::Accordion);
        ctl.mark_converted(&g("a"));
        assert!(ctl.state(&g("a")).unwrap().expanded);
        assert!(ctl.set_expanded(&g("a"), false));
        assert!(!ctl.set_expanded(&g("a"), false));
        assert!(!ctl.open_tray(&g("a")));
    }

    #[test]
    fn test_mode_serde() {
        let mode: PresentationMode = serde_json::from_str("\"accordion\"").unwrap();
        assert_eq!(mode, PresentationMode::Accordion);
        assert_eq!(PresentationMode::Tray.to_string(), "tray");
    }
}
