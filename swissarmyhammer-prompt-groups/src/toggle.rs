//! Enable/disable toggles with validation
//!
//! Disabling commits immediately. Enabling asks the [`ValidationCollaborator`]
//! first; reported issues park the request under a [`ToggleTicket`] until a
//! decision arrives. Every commit is bracketed by the [`MutationGuard`] so the
//! host can ignore the change notifications it triggers.

use crate::error::{GroupError, Result};
use crate::store::OrderStore;
use crate::types::{EntryId, GroupId, OrderEntry, ToggleTicket};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{oneshot, Mutex};

/// Category of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Another enabled entry conflicts with this one
    Conflict,
    /// This entry requires another entry that is disabled
    MissingRequirement,
    Other,
}

/// Change the collaborator proposes to resolve an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "entry", rename_all = "snake_case")]
pub enum AutoResolution {
    Disable(EntryId),
    Enable(EntryId),
}

impl AutoResolution {
    /// The change as an (identifier, enabled) pair
    pub fn as_change(&self) -> (EntryId, bool) {
        match self {
            Self::Disable(id) => (id.clone(), false),
            Self::Enable(id) => (id.clone(), true),
        }
    }
}

/// One issue reported for an enable request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_resolution: Option<AutoResolution>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            auto_resolution: None,
        }
    }

    pub fn with_resolution(mut self, resolution: AutoResolution) -> Self {
        self.auto_resolution = Some(resolution);
        self
    }
}

/// Validates an enable request against the full set with state
pub trait ValidationCollaborator {
    fn validate(&self, identifier: &EntryId, order: &[OrderEntry]) -> Vec<ValidationIssue>;
}

/// Collaborator that never reports issues
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl ValidationCollaborator for NoValidation {
    fn validate(&self, _identifier: &EntryId, _order: &[OrderEntry]) -> Vec<ValidationIssue> {
        Vec::new()
    }
}

/// Brackets every commit the engine makes to the order store
pub trait MutationGuard {
    fn begin_external_mutation(&mut self);
    fn end_external_mutation(&mut self);
}

/// Guard that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGuard;

impl MutationGuard for NoopGuard {
    fn begin_external_mutation(&mut self) {}
    fn end_external_mutation(&mut self) {}
}

/// Answer to a pending enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Proceed,
    Cancel,
}

/// Asks someone whether to proceed with an enable that has issues
#[async_trait]
pub trait DecisionPrompt: Send + Sync {
    async fn decide(&self, identifier: &EntryId, issues: &[ValidationIssue]) -> Decision;
}

/// Prompt answered once from elsewhere through a [`DecisionSender`].
///
/// A dropped sender, or asking twice, yields [`Decision::Cancel`].
pub struct DialogDecision {
    receiver: Mutex<Option<oneshot::Receiver<Decision>>>,
}

/// Sending half of a [`DialogDecision`]
pub struct DecisionSender(oneshot::Sender<Decision>);

impl DecisionSender {
    /// Deliver the answer. False if the prompt is gone.
    pub fn send(self, decision: Decision) -> bool {
        self.0.send(decision).is_ok()
    }
}

impl DialogDecision {
    pub fn channel() -> (Self, DecisionSender) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                receiver: Mutex::new(Some(rx)),
            },
            DecisionSender(tx),
        )
    }
}

#[async_trait]
impl DecisionPrompt for DialogDecision {
    async fn decide(&self, identifier: &EntryId, issues: &[ValidationIssue]) -> Decision {
        let receiver = self.receiver.lock().await.take();
        let Some(receiver) = receiver else {
            tracing::warn!(entry = %identifier, "decision already consumed, cancelling");
            return Decision::Cancel;
        };
        tracing::debug!(entry = %identifier, issues = issues.len(), "waiting for decision");
        receiver.await.unwrap_or(Decision::Cancel)
    }
}

/// What a toggle request did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// Committed now. `changed` lists every entry whose flag actually flipped.
    Immediate {
        identifier: EntryId,
        enabled: bool,
        changed: Vec<EntryId>,
    },
    /// Parked until [`Decision`] arrives for `ticket`
    Pending {
        ticket: ToggleTicket,
        identifier: EntryId,
        issues: Vec<ValidationIssue>,
    },
}

impl ToggleOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn ticket(&self) -> Option<&ToggleTicket> {
        match self {
            Self::Pending { ticket, .. } => Some(ticket),
            Self::Immediate { .. } => None,
        }
    }
}

/// What resolving a ticket did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleResolution {
    pub ticket: ToggleTicket,
    pub identifier: EntryId,
    pub decision: Decision,
    /// Entries whose flag flipped; empty on cancel
    pub changed: Vec<EntryId>,
}

/// Result of a bulk group toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupToggleReport {
    pub group: GroupId,
    pub enabled: bool,
    pub changed: Vec<EntryId>,
    /// Enable requests held back because validation reported issues
    pub blocked: Vec<BlockedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedEntry {
    pub identifier: EntryId,
    pub issues: Vec<ValidationIssue>,
}

/// A parked enable request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    pub ticket: ToggleTicket,
    pub identifier: EntryId,
    pub issues: Vec<ValidationIssue>,
}

impl PendingToggle {
    /// Changes to apply on proceed: auto-resolutions first, then the entry itself
    pub fn changes(&self) -> Vec<(EntryId, bool)> {
        self.issues
            .iter()
            .filter_map(|issue| issue.auto_resolution.as_ref())
            .map(AutoResolution::as_change)
            .filter(|(id, _)| *id != self.identifier)
            .chain(std::iter::once((self.identifier.clone(), true)))
            .collect()
    }
}

/// Book of pending enable requests, at most one per entry
#[derive(Debug, Default)]
pub struct ToggleCoordinator {
    pending: HashMap<ToggleTicket, PendingToggle>,
    by_entry: HashMap<EntryId, ToggleTicket>,
}

impl ToggleCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an enable request. A second request for the same entry coalesces
    /// onto the existing ticket and refreshes its issues.
    pub fn park(&mut self, identifier: &EntryId, issues: Vec<ValidationIssue>) -> ToggleTicket {
        if let Some(ticket) = self.by_entry.get(identifier) {
            if let Some(pending) = self.pending.get_mut(ticket) {
                tracing::debug!(
                    entry = %identifier,
                    ticket = %ticket,
                    "coalescing enable onto pending ticket"
                );
                pending.issues = issues;
                return ticket.clone();
            }
        }

        let ticket = ToggleTicket::generate();
        self.by_entry.insert(identifier.clone(), ticket.clone());
        self.pending.insert(
            ticket.clone(),
            PendingToggle {
                ticket: ticket.clone(),
                identifier: identifier.clone(),
                issues,
            },
        );
        ticket
    }

    /// Remove the pending request of an entry, if any
    pub fn cancel_for(&mut self, identifier: &EntryId) -> Option<PendingToggle> {
        let ticket = self.by_entry.remove(identifier)?;
        self.pending.remove(&ticket)
    }

    /// Take a ticket for resolution. Each ticket can be taken once.
    pub fn take(&mut self, ticket: &ToggleTicket) -> Result<PendingToggle> {
        let pending = self
            .pending
            .remove(ticket)
            .ok_or_else(|| GroupError::TicketNotFound {
                ticket: ticket.to_string(),
            })?;
        self.by_entry.remove(&pending.identifier);
        Ok(pending)
    }

    pub fn get(&self, ticket: &ToggleTicket) -> Option<&PendingToggle> {
        self.pending.get(ticket)
    }

    pub fn ticket_for(&self, identifier: &EntryId) -> Option<&ToggleTicket> {
        self.by_entry.get(identifier)
    }

    /// Drop every pending request
    pub fn clear(&mut self) -> Vec<PendingToggle> {
        self.by_entry.clear();
        self.pending.drain().map(|(_, p)| p).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Flags written by [`commit_changes`] and whether persisting them worked
#[derive(Debug)]
pub struct Committed {
    /// Entries whose flag was written, even when persisting failed
    pub changed: Vec<EntryId>,
    pub persisted: Result<()>,
}

impl Committed {
    pub fn into_result(self) -> Result<Vec<EntryId>> {
        self.persisted.map(|_| self.changed)
    }
}

/// Write enabled flags through the store and persist, bracketed by `guard`.
///
/// Entries missing from the order list are logged and skipped. The guard is
/// always closed, even when persisting fails. Only a missing active context
/// is an `Err`; a persist failure is carried in [`Committed::persisted`].
pub fn commit_changes<S>(
    store: &mut S,
    guard: &mut dyn MutationGuard,
    changes: &[(EntryId, bool)],
) -> Result<Committed>
where
    S: OrderStore + ?Sized,
{
    if store.active_context().is_none() {
        return Err(GroupError::InvalidContext);
    }

    guard.begin_external_mutation();
    let mut changed = Vec::new();
    for (identifier, enabled) in changes {
        match store.is_enabled(identifier) {
            Some(current) if current == *enabled => {}
            Some(_) => {
                store.set_enabled(identifier, *enabled);
                changed.push(identifier.clone());
            }
            None => tracing::warn!(entry = %identifier, "entry not in order list, toggle skipped"),
        }
    }
    let persisted = if changed.is_empty() {
        Ok(())
    } else {
        store.persist()
    };
    guard.end_external_mutation();

    Ok(Committed { changed, persisted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOrderStore;

    #[derive(Default)]
    struct Counting {
        begins: usize,
        ends: usize,
    }

    impl MutationGuard for Counting {
        fn begin_external_mutation(&mut self) {
            self.begins += 1;
        }
        fn end_external_mutation(&mut self) {
            self.ends += 1;
        }
    }

    fn store() -> InMemoryOrderStore {
        InMemoryOrderStore::with_order(
            "ctx",
            vec![OrderEntry::new("a", false), OrderEntry::new("b", true)],
        )
    }

    #[test]
    fn test_park_coalesces() {
        let mut coord = ToggleCoordinator::new();
        let id = EntryId::from("a");
        let first = coord.park(&id, vec![ValidationIssue::new(IssueKind::Other, "one")]);
        let second = coord.park(&id, vec![ValidationIssue::new(IssueKind::Other, "two")]);
        assert_eq!(first, second);
        assert_eq!(coord.len(), 1);
        assert_eq!(coord.get(&first).unwrap().issues[0].message, "two");
    }

    #[test]
    fn test_take_once() {
        let mut coord = ToggleCoordinator::new();
        let ticket = coord.park(&EntryId::from("a"), Vec::new());
        assert!(coord.take(&ticket).is_ok());
        let again = coord.take(&ticket);
        assert!(matches!(again, Err(GroupError::TicketNotFound { .. })));
        assert!(coord.ticket_for(&EntryId::from("a")).is_none());
    }

    #[test]
    fn test_pending_changes_apply_resolutions_first() {
        let pending = PendingToggle {
            ticket: ToggleTicket::generate(),
            identifier: EntryId::from("a"),
            issues: vec![
                ValidationIssue::new(IssueKind::Conflict, "b conflicts")
                    .with_resolution(AutoResolution::Disable(EntryId::from("b"))),
                ValidationIssue::new(IssueKind::Other, "note"),
            ],
        };
        assert_eq!(
            pending.changes(),
            vec![(EntryId::from("b"), false), (EntryId::from("a"), true)]
        );
    }

    #[test]
    fn test_commit_brackets_and_persists() {
        let mut store = store();
        let mut guard = Counting::default();
        let changed = commit_changes(
            &mut store,
            &mut guard,
            &[(EntryId::from("a"), true), (EntryId::from("b"), true)],
        )
        .unwrap()
        .into_result()
        .unwrap();
        assert_eq!(changed, vec![EntryId::from("a")]);
        assert_eq!((guard.begins, guard.ends), (1, 1));
        assert_eq!(store.persist_count(), 1);
    }

    #[test]
    fn test_commit_closes_guard_on_persist_failure() {
        let mut store = store();
        store.set_fail_persist(true);
        let mut guard = Counting::default();
        let committed =
            commit_changes(&mut store, &mut guard, &[(EntryId::from("a"), true)]).unwrap();
        assert_eq!(committed.changed, vec![EntryId::from("a")]);
        assert!(matches!(committed.persisted, Err(GroupError::Persist { .. })));
        assert_eq!(store.is_enabled(&EntryId::from("a")), Some(true));
        assert_eq!((guard.begins, guard.ends), (1, 1));
    }

    #[test]
    fn test_commit_without_context() {
        let mut store = InMemoryOrderStore::new();
        let mut guard = Counting::default();
        let result = commit_changes(&mut store, &mut guard, &[(EntryId::from("a"), true)]);
        assert!(matches!(result, Err(GroupError::InvalidContext)));
        assert_eq!(guard.begins, 0);
    }

    #[tokio::test]
    async fn test_dialog_decision() {
        let (dialog, sender) = DialogDecision::channel();
        assert!(sender.send(Decision::Proceed));
        let id = EntryId::from("a");
        assert_eq!(dialog.decide(&id, &[]).await, Decision::Proceed);
        assert_eq!(dialog.decide(&id, &[]).await, Decision::Cancel);
    }

    #[tokio::test]
    async fn test_dialog_dropped_sender_cancels() {
        let (dialog, sender) = DialogDecision::channel();
        drop(sender);
        assert_eq!(dialog.decide(&EntryId::from("a"), &[]).await, Decision::Cancel);
    }
}
