//! Scripted collaborators for tests
//!
//! Gated behind the `test-support` feature. The crate enables it for its own
//! unit and integration tests through a self dev-dependency.

use crate::presentation::{PresentationLayer, PresentedElement};
use crate::toggle::{MutationGuard, ValidationCollaborator, ValidationIssue};
use crate::types::{Counts, EntryId, GroupId, Member, OrderEntry};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Build an order list from `(identifier, enabled)` pairs
pub fn order(entries: &[(&str, bool)]) -> Vec<OrderEntry> {
    entries
        .iter()
        .map(|(id, enabled)| OrderEntry::new(*id, *enabled))
        .collect()
}

/// Build entry ids
pub fn ids(ids: &[&str]) -> Vec<EntryId> {
    ids.iter().map(|id| EntryId::from(*id)).collect()
}

/// Side effect recorded by [`ScriptedPresentation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    MembersHidden { group: GroupId, hidden: bool },
    TrayTriggerAttached(GroupId),
    TrayTriggerDetached(GroupId),
    ReorderAttached(GroupId),
    ReorderDetached(GroupId),
    Expanded { group: GroupId, expanded: bool },
    OverlayOpened { group: GroupId, members: Vec<Member> },
    OverlayClosed(GroupId),
    PromotionZone(bool),
    Highlight(Option<GroupId>),
    ContextMenuOpened(EntryId),
    ContextMenuClosed,
}

/// Presentation layer whose shown elements are set by the test
#[derive(Debug, Default)]
pub struct ScriptedPresentation {
    shown: HashMap<GroupId, Vec<PresentedElement>>,
    counts: HashMap<GroupId, Counts>,
    events: Vec<PresentationEvent>,
}

impl ScriptedPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace what a group currently shows
    pub fn show(&mut self, group: &GroupId, elements: Vec<PresentedElement>) {
        self.shown.insert(group.clone(), elements);
    }

    /// Show `(identifier, display name)` entries for a group
    pub fn show_entries(&mut self, group: &GroupId, entries: &[(&str, &str)]) {
        let elements = entries
            .iter()
            .map(|(id, name)| PresentedElement::entry(*id, *name))
            .collect();
        self.show(group, elements);
    }

    /// Stop showing anything for a group
    pub fn hide(&mut self, group: &GroupId) {
        self.shown.remove(group);
    }

    pub fn hide_all(&mut self) {
        self.shown.clear();
    }

    /// Last counter published for a group
    pub fn counts(&self, group: &GroupId) -> Option<Counts> {
        self.counts.get(group).copied()
    }

    pub fn events(&self) -> &[PresentationEvent] {
        &self.events
    }

    pub fn count_events(&self, predicate: impl Fn(&PresentationEvent) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl PresentationLayer for ScriptedPresentation {
    fn elements(&self, group: &GroupId) -> Vec<PresentedElement> {
        self.shown.get(group).cloned().unwrap_or_default()
    }

    fn publish_counts(&mut self, group: &GroupId, counts: Counts) {
        self.counts.insert(group.clone(), counts);
    }

    fn set_members_hidden(&mut self, group: &GroupId, hidden: bool) {
        self.events.push(PresentationEvent::MembersHidden {
            group: group.clone(),
            hidden,
        });
    }

    fn attach_tray_trigger(&mut self, group: &GroupId) {
        self.events.push(PresentationEvent::TrayTriggerAttached(group.clone()));
    }

    fn detach_tray_trigger(&mut self, group: &GroupId) {
        self.events.push(PresentationEvent::TrayTriggerDetached(group.clone()));
    }

    fn attach_reorder_handler(&mut self, group: &GroupId) {
        self.events.push(PresentationEvent::ReorderAttached(group.clone()));
    }

    fn detach_reorder_handler(&mut self, group: &GroupId) {
        self.events.push(PresentationEvent::ReorderDetached(group.clone()));
    }

    fn set_expanded(&mut self, group: &GroupId, expanded: bool) {
        self.events.push(PresentationEvent::Expanded {
            group: group.clone(),
            expanded,
        });
    }

    fn open_overlay(&mut self, group: &GroupId, members: &[Member]) {
        self.events.push(PresentationEvent::OverlayOpened {
            group: group.clone(),
            members: members.to_vec(),
        });
    }

    fn close_overlay(&mut self, group: &GroupId) {
        self.events.push(PresentationEvent::OverlayClosed(group.clone()));
    }

    fn set_promotion_zone_visible(&mut self, visible: bool) {
        self.events.push(PresentationEvent::PromotionZone(visible));
    }

    fn highlight_drop_target(&mut self, group: Option<&GroupId>) {
        self.events.push(PresentationEvent::Highlight(group.cloned()));
    }

    fn open_context_menu(&mut self, entry: &EntryId) {
        self.events.push(PresentationEvent::ContextMenuOpened(entry.clone()));
    }

    fn close_context_menu(&mut self) {
        self.events.push(PresentationEvent::ContextMenuClosed);
    }
}

/// Validation collaborator with issues scripted per entry.
///
/// Clones share the script, so a test keeps a handle after moving one into
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct ScriptedValidator {
    issues: Rc<RefCell<HashMap<EntryId, Vec<ValidationIssue>>>>,
}

impl ScriptedValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_issues(&self, identifier: &str, issues: Vec<ValidationIssue>) {
        self.issues
            .borrow_mut()
            .insert(EntryId::from(identifier), issues);
    }

    pub fn clear_issues(&self, identifier: &str) {
        self.issues.borrow_mut().remove(&EntryId::from(identifier));
    }
}

impl ValidationCollaborator for ScriptedValidator {
    fn validate(&self, identifier: &EntryId, _order: &[OrderEntry]) -> Vec<ValidationIssue> {
        self.issues
            .borrow()
            .get(identifier)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct GuardLog {
    begins: usize,
    ends: usize,
    depth: usize,
    max_depth: usize,
}

/// Mutation guard that counts its brackets. Clones share the counters.
#[derive(Debug, Clone, Default)]
pub struct RecordingGuard {
    log: Rc<RefCell<GuardLog>>,
}

impl RecordingGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begins(&self) -> usize {
        self.log.borrow().begins
    }

    pub fn ends(&self) -> usize {
        self.log.borrow().ends
    }

    /// Every begin was matched by an end and brackets never nested
    pub fn is_balanced(&self) -> bool {
        let log = self.log.borrow();
        log.begins == log.ends && log.depth == 0 && log.max_depth <= 1
    }
}

impl MutationGuard for RecordingGuard {
    fn begin_external_mutation(&mut self) {
        let mut log = self.log.borrow_mut();
        log.begins += 1;
        log.depth += 1;
        log.max_depth = log.max_depth.max(log.depth);
    }

    fn end_external_mutation(&mut self) {
        let mut log = self.log.borrow_mut();
        log.ends += 1;
        log.depth = log.depth.saturating_sub(1);
    }
}
