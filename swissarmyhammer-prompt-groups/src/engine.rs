//! The prompt groups engine
//!
//! [`PromptGroups`] owns the group tree, membership cache, mode controller,
//! interaction slots and pending toggles, and drives the order store and the
//! presentation layer through their traits. Every mutation of the order list
//! is persisted, recorded in the activity log and followed by a count refresh
//! before the call returns.

use crate::activity::{ActivityLog, Outcome};
use crate::aggregate::Aggregator;
use crate::cache::GroupCache;
use crate::config::GroupsConfig;
use crate::discovery::{self, Discovery};
use crate::drag::{DragSession, DropAction, DropOutcome, GridDrop, SourceContainer};
use crate::error::{GroupError, Result};
use crate::interaction::{ContextMenu, InteractionSlot};
use crate::logging::Pretty;
use crate::mode::{ConvertAction, GroupModeState, ModeController, PresentationMode};
use crate::presentation::PresentationLayer;
use crate::reconcile::{OrderReconciler, Reconciled};
use crate::store::OrderStore;
use crate::toggle::{
    commit_changes, BlockedEntry, Decision, DecisionPrompt, GroupToggleReport, MutationGuard,
    NoValidation, NoopGuard, ToggleCoordinator, ToggleOutcome, ToggleResolution,
    ValidationCollaborator,
};
use crate::tree::GroupTree;
use crate::types::{Counts, EntryId, GroupId, ToggleTicket};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Instant;

/// Grouping engine over an order store `S` and a presentation layer `P`
pub struct PromptGroups<S, P> {
    config: GroupsConfig,
    store: S,
    presentation: P,
    validator: Box<dyn ValidationCollaborator>,
    guard: Box<dyn MutationGuard>,
    tree: GroupTree,
    cache: GroupCache,
    modes: ModeController,
    drag: InteractionSlot<DragSession>,
    overlay: InteractionSlot<GroupId>,
    context_menu: InteractionSlot<ContextMenu>,
    toggles: ToggleCoordinator,
    activity: ActivityLog,
    initialized: bool,
}

impl<S, P> PromptGroups<S, P>
where
    S: OrderStore,
    P: PresentationLayer,
{
    pub fn new(config: GroupsConfig, store: S, presentation: P) -> Self {
        let tree = GroupTree::new(config.top_level_name.clone());
        let activity = ActivityLog::new(config.activity_capacity);
        Self {
            config,
            store,
            presentation,
            validator: Box::new(NoValidation),
            guard: Box::new(NoopGuard),
            tree,
            cache: GroupCache::new(),
            modes: ModeController::new(),
            drag: InteractionSlot::new(),
            overlay: InteractionSlot::new(),
            context_menu: InteractionSlot::new(),
            toggles: ToggleCoordinator::new(),
            activity,
            initialized: false,
        }
    }

    pub fn with_validator(mut self, validator: impl ValidationCollaborator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_mutation_guard(mut self, guard: impl MutationGuard + 'static) -> Self {
        self.guard = Box::new(guard);
        self
    }

    /// Scan every group and enter the configured default mode. Calling it
    /// again does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            tracing::debug!("already initialized");
            return Ok(());
        }
        self.initialized = true;
        tracing::info!(
            groups = self.tree.len(),
            mode = %self.config.default_mode,
            "initializing prompt groups"
        );
        self.on_mode_changed(self.config.default_mode);
        self.refresh_all()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ---- accessors ----

    pub fn config(&self) -> &GroupsConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable store access. Call [`Self::on_context_changed`] after switching
    /// the active context.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn tree(&self) -> &GroupTree {
        &self.tree
    }

    pub fn cache(&self) -> &GroupCache {
        &self.cache
    }

    pub fn mode(&self) -> PresentationMode {
        self.modes.mode()
    }

    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn pending_toggles(&self) -> &ToggleCoordinator {
        &self.toggles
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.current()
    }

    /// Group whose tray overlay is open
    pub fn open_overlay(&self) -> Option<&GroupId> {
        self.overlay.current()
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.context_menu.current()
    }

    pub fn top_level_id(&self) -> GroupId {
        self.tree.top_level_id()
    }

    // ---- group management ----

    pub fn create_group(&mut self, name: &str, parent: Option<&GroupId>) -> Result<GroupId> {
        let id = self.tree.create_group(name, parent)?;
        tracing::info!(group = %id, name, parent = ?parent, "created group");
        Ok(id)
    }

    pub fn rename_group(&mut self, id: &GroupId, name: &str) -> Result<()> {
        self.tree.rename_group(id, name)?;
        self.cache.rename_marker(id, name);
        tracing::info!(group = %id, name, "renamed group");
        Ok(())
    }

    /// Move a group under a new parent (`None` = root level)
    pub fn reparent_group(&mut self, id: &GroupId, new_parent: Option<&GroupId>) -> Result<()> {
        let old_parent = self.tree.parent_of(id).cloned();
        self.tree.reparent_group(id, new_parent)?;
        self.cache.remove_marker(id);
        self.modes.clear_absorbed();
        tracing::info!(group = %id, from = ?old_parent, to = ?new_parent, "reparented group");

        let mut touched: Vec<GroupId> = old_parent.into_iter().collect();
        touched.push(id.clone());
        self.publish(&touched);
        Ok(())
    }

    /// Remove a group from the tree. Its child groups take its place and its
    /// own entries move to its parent, or to TopLevel at root level.
    ///
    /// Returns the entries that were re-homed.
    pub fn dissolve_group(&mut self, id: &GroupId) -> Result<Vec<EntryId>> {
        if self.tree.get(id).is_some_and(|g| g.is_top_level()) {
            return Err(GroupError::invalid_operation("the TopLevel group cannot be dissolved"));
        }
        if !self.tree.contains(id) {
            return Err(GroupError::group_not_found(id.as_str()));
        }

        self.teardown_group_mode(id);
        let removed = self.tree.remove_group(id)?;
        let heir = removed.parent.unwrap_or_else(GroupId::top_level);

        let orphans: Vec<_> = self.cache.entries(id).cloned().collect();
        self.cache.invalidate(id);
        self.cache.remove_marker(id);
        for entry in &orphans {
            self.cache.insert_entry(&heir, usize::MAX, entry.clone());
        }
        self.modes.clear_absorbed();

        tracing::info!(group = %id, heir = %heir, entries = orphans.len(), "dissolved group");
        self.publish(std::slice::from_ref(&heir));
        Ok(orphans.into_iter().map(|e| e.identifier).collect())
    }

    // ---- discovery and refresh ----

    /// Discover one group's members, writing through to the cache
    pub fn discover(&mut self, group: &GroupId) -> Result<Discovery> {
        let found = discovery::discover(&self.tree, &mut self.cache, &self.presentation, group)?;
        self.modes.absorb(found.absorbed.iter().cloned());
        Ok(found)
    }

    /// The presentation layer reports that a group's elements changed.
    /// Skipped while a drag is in flight. Nothing shown falls back to the
    /// cached membership.
    pub fn on_membership_changed(&mut self, group: &GroupId) -> Result<()> {
        if self.drag.is_active() {
            tracing::debug!(group = %group, "drag in flight, membership refresh skipped");
            return Ok(());
        }
        if !self.tree.contains(group) {
            return Err(GroupError::group_not_found(group.as_str()));
        }

        let found = self.discover(group)?;
        if self.overlay.current() == Some(group) {
            self.presentation.open_overlay(group, &found.members);
        }
        self.publish(std::slice::from_ref(group));
        Ok(())
    }

    /// Re-discover every group, convert new groups to the active mode and
    /// publish every counter. Skipped while a drag is in flight.
    pub fn refresh_all(&mut self) -> Result<()> {
        if self.drag.is_active() {
            tracing::debug!("drag in flight, refresh skipped");
            return Ok(());
        }

        let ids = self.tree.all_ids();
        for group in &ids {
            if self.modes.is_absorbed(group) {
                continue;
            }
            let empty = self.cache.has_no_entries(group);
            if !group.is_top_level() && self.modes.plan(group, empty) == ConvertAction::Convert {
                self.convert_group(group)?;
            } else {
                self.discover(group)?;
            }
        }

        self.publish(&ids);
        Ok(())
    }

    /// The active selection context switched: every cached membership and
    /// pending toggle belongs to the old context.
    pub fn on_context_changed(&mut self) -> Result<()> {
        let dropped = self.toggles.clear();
        if !dropped.is_empty() {
            tracing::info!(count = dropped.len(), "context changed, pending toggles dropped");
        }
        self.teardown_drag();
        self.dismiss();
        self.cache.invalidate_all();
        self.modes.clear_absorbed();
        tracing::info!(context = ?self.store.active_context(), "selection context changed");

        if self.initialized {
            self.refresh_all()?;
        }
        Ok(())
    }

    // ---- presentation modes ----

    /// Handle a mode-changed signal. Leaving a mode tears every converted
    /// group down first; re-entering only re-scans converted groups whose
    /// cached membership is empty.
    pub fn on_mode_changed(&mut self, mode: PresentationMode) {
        let transition = self.modes.begin_transition(mode);
        for reverted in &transition.reverted {
            self.revert_effects(&reverted.group, reverted.state);
        }
        if !transition.reverted.is_empty() {
            self.overlay.clear();
        }

        if mode == PresentationMode::Off {
            return;
        }
        for group in self.tree.depth_first() {
            let action = self.modes.plan(&group, self.cache.has_no_entries(&group));
            let result = match action {
                ConvertAction::Convert => self.convert_group(&group),
                ConvertAction::Rescan => self.discover(&group).map(|_| ()),
                ConvertAction::Skip => Ok(()),
            };
            if let Err(e) = result {
                tracing::warn!(group = %group, error = %e, "group conversion failed");
            }
        }
    }

    /// Revert one group to unconverted. Returns false if it was not converted.
    pub fn teardown_group_mode(&mut self, group: &GroupId) -> bool {
        match self.modes.revert(group) {
            Some(state) => {
                self.revert_effects(group, state);
                if self.overlay.current() == Some(group) {
                    self.overlay.clear();
                }
                true
            }
            None => false,
        }
    }

    /// Open a tray group's overlay, closing any other open overlay first.
    /// Returns false if the group is not a converted tray group or is already
    /// open.
    pub fn open_tray(&mut self, group: &GroupId) -> Result<bool> {
        if !self.tree.contains(group) {
            return Err(GroupError::group_not_found(group.as_str()));
        }
        if !self.modes.open_tray(group) {
            return Ok(false);
        }

        if let Some(previous) = self.overlay.replace(group.clone()) {
            if &previous != group {
                self.modes.close_tray(&previous);
                self.presentation.close_overlay(&previous);
            }
        }
        let found = self.discover(group)?;
        self.presentation.open_overlay(group, &found.members);
        tracing::debug!(group = %group, members = found.members.len(), "tray opened");
        Ok(true)
    }

    /// Close a tray overlay. Closing a closed tray does nothing.
    pub fn close_tray(&mut self, group: &GroupId) -> bool {
        if !self.modes.close_tray(group) {
            return false;
        }
        if self.overlay.current() == Some(group) {
            self.overlay.clear();
        }
        self.presentation.close_overlay(group);
        true
    }

    /// Expand or collapse an accordion group. No-op on unconverted groups.
    pub fn set_expanded(&mut self, group: &GroupId, expanded: bool) -> bool {
        if !self.modes.set_expanded(group, expanded) {
            return false;
        }
        self.presentation.set_expanded(group, expanded);
        true
    }

    /// Escape-style dismissal: close the open overlay and context menu.
    /// Returns true if anything was closed.
    pub fn dismiss(&mut self) -> bool {
        let mut closed = false;
        if let Some(group) = self.overlay.clear() {
            self.modes.close_tray(&group);
            self.presentation.close_overlay(&group);
            closed = true;
        }
        if self.context_menu.clear().is_some() {
            self.presentation.close_context_menu();
            closed = true;
        }
        closed
    }

    /// Open the context menu for an entry, replacing any open menu
    pub fn open_context_menu(&mut self, entry: &EntryId) -> Result<()> {
        if self.store.is_enabled(entry).is_none() {
            return Err(GroupError::entry_not_found(entry.as_str()));
        }
        let menu = ContextMenu {
            entry: entry.clone(),
            group: self.cache.group_of(entry).cloned(),
        };
        if self.context_menu.replace(menu).is_some() {
            self.presentation.close_context_menu();
        }
        self.presentation.open_context_menu(entry);
        Ok(())
    }

    pub fn close_context_menu(&mut self) -> bool {
        if self.context_menu.clear().is_none() {
            return false;
        }
        self.presentation.close_context_menu();
        true
    }

    // ---- counts ----

    pub fn get_aggregated_counts(&self, group: &GroupId) -> Result<Counts> {
        if !self.tree.contains(group) {
            return Err(GroupError::group_not_found(group.as_str()));
        }
        Ok(Aggregator::new(&self.tree, &self.cache, self.store.order()).aggregated_counts(group))
    }

    pub fn direct_counts(&self, group: &GroupId) -> Result<Counts> {
        if !self.tree.contains(group) {
            return Err(GroupError::group_not_found(group.as_str()));
        }
        Ok(Aggregator::new(&self.tree, &self.cache, self.store.order()).direct_counts(group))
    }

    // ---- order moves ----

    pub fn move_to_group_top(
        &mut self,
        identifier: &EntryId,
        target: &GroupId,
    ) -> Result<Reconciled> {
        self.require_group(target)?;
        let input = json!({ "identifier": identifier, "target": target });
        self.reconcile("move entry-top", input, |r| r.move_to_group_top(identifier, target))
    }

    pub fn move_to_index(
        &mut self,
        identifier: &EntryId,
        target: &GroupId,
        visual_index: usize,
        snapshot: &[EntryId],
    ) -> Result<Reconciled> {
        self.require_group(target)?;
        let input = json!({
            "identifier": identifier,
            "target": target,
            "visual_index": visual_index,
            "snapshot": snapshot,
        });
        self.reconcile("move entry-index", input, |r| {
            r.move_to_index(identifier, target, visual_index, snapshot)
        })
    }

    pub fn reorder_within_group(
        &mut self,
        group: &GroupId,
        new_order: &[EntryId],
    ) -> Result<Reconciled> {
        self.require_group(group)?;
        let input = json!({ "group": group, "order": new_order });
        self.reconcile("reorder group", input, |r| {
            r.reorder_within_group(group, new_order)
        })
    }

    fn reconcile<F>(&mut self, op: &'static str, input: Value, f: F) -> Result<Reconciled>
    where
        F: FnOnce(&mut OrderReconciler<'_>) -> Reconciled,
    {
        let started = Instant::now();
        if self.store.active_context().is_none() {
            tracing::warn!(op, "no active context, mutation aborted");
            return Err(GroupError::InvalidContext);
        }

        self.guard.begin_external_mutation();
        let reconciled = match self.store.order_mut() {
            Some(order) => Ok(f(&mut OrderReconciler::new(order, &mut self.cache, &self.tree))),
            None => Err(GroupError::InvalidContext),
        };
        let persisted = match &reconciled {
            Ok(r) if r.changed => self.store.persist(),
            _ => Ok(()),
        };
        self.guard.end_external_mutation();

        // Counters follow the order list even when persisting failed
        if let Ok(r) = &reconciled {
            self.publish(&r.affected);
        }
        let result = reconciled.and_then(|r| persisted.map(|_| r));
        let changed = result.as_ref().map_or(true, |r| r.changed);
        if let Err(e) = &result {
            tracing::warn!(op, error = %e, "mutation failed");
        }
        self.record(op, input, started, changed, result)
    }

    // ---- drag and drop ----

    /// Start a drag. A stale session still open is torn down first.
    pub fn begin_drag(
        &mut self,
        identifier: &EntryId,
        source_group: &GroupId,
        container: SourceContainer,
    ) -> Result<()> {
        self.require_group(source_group)?;
        if self.teardown_drag().is_some() {
            tracing::warn!("stale drag session torn down");
        }
        self.drag.replace(DragSession::new(
            identifier.clone(),
            source_group.clone(),
            container,
        ));
        self.presentation.set_promotion_zone_visible(true);
        tracing::debug!(entry = %identifier, group = %source_group, ?container, "drag started");
        Ok(())
    }

    /// The pointer entered (or left, with `None`) a group header
    pub fn hover_group(&mut self, group: Option<&GroupId>) -> bool {
        let Some(session) = self.drag.current_mut() else {
            return false;
        };
        session.hovered_group = group.cloned();
        let highlight = group.filter(|g| **g != session.source_group);
        self.presentation.highlight_drop_target(highlight);
        true
    }

    pub fn set_over_promotion_zone(&mut self, over: bool) -> bool {
        match self.drag.current_mut() {
            Some(session) => {
                session.over_promotion_zone = over;
                true
            }
            None => false,
        }
    }

    /// Finish the drag with exactly one action. The session is torn down
    /// whatever happens. `Ok(None)` when no drag was in flight.
    pub fn drop_at(&mut self, grid: Option<GridDrop>) -> Result<Option<DropOutcome>> {
        let Some(session) = self.drag.current().cloned() else {
            tracing::debug!("drop without drag session");
            return Ok(None);
        };

        let action = session.resolve(grid.as_ref(), &self.tree.top_level_id());
        tracing::debug!(entry = %session.dragged, "drop resolved: {}", Pretty(&action));
        let result = match &action {
            DropAction::Promote { target } | DropAction::MoveToGroupTop { target } => {
                self.move_to_group_top(&session.dragged, target).map(Some)
            }
            DropAction::Reorder { group, order } => {
                self.reorder_within_group(group, order).map(Some)
            }
            DropAction::MoveToIndex {
                target,
                visual_index,
                snapshot,
            } => self
                .move_to_index(&session.dragged, target, *visual_index, snapshot)
                .map(Some),
            DropAction::Nothing => Ok(None),
        };

        self.teardown_drag();
        if session.source_container == SourceContainer::Overlay
            && self.overlay.current() == Some(&session.source_group)
        {
            let members = self.cache.flatten(&session.source_group);
            self.presentation.open_overlay(&session.source_group, &members);
        }

        let reconciled = result?;
        Ok(Some(DropOutcome {
            dragged: session.dragged,
            action,
            reconciled,
        }))
    }

    /// Abandon the drag without any mutation
    pub fn cancel_drag(&mut self) -> bool {
        self.teardown_drag().is_some()
    }

    fn teardown_drag(&mut self) -> Option<DragSession> {
        let session = self.drag.clear()?;
        self.presentation.highlight_drop_target(None);
        self.presentation.set_promotion_zone_visible(false);
        Some(session)
    }

    // ---- toggles ----

    /// Enable or disable one entry.
    ///
    /// Disabling commits immediately and cancels a pending enable of the same
    /// entry. Enabling commits when validation reports nothing; otherwise it
    /// parks the request (coalescing onto an already pending ticket).
    pub fn toggle(&mut self, identifier: &EntryId, enabled: bool) -> Result<ToggleOutcome> {
        let started = Instant::now();
        if self.store.active_context().is_none() {
            return Err(GroupError::InvalidContext);
        }
        let Some(current) = self.store.is_enabled(identifier) else {
            tracing::warn!(entry = %identifier, "toggle for unknown entry");
            return Err(GroupError::entry_not_found(identifier.as_str()));
        };

        if !enabled {
            if let Some(pending) = self.toggles.cancel_for(identifier) {
                tracing::info!(
                    entry = %identifier,
                    ticket = %pending.ticket,
                    "pending enable cancelled by disable"
                );
            }
        } else {
            let issues = if current {
                Vec::new()
            } else {
                self.validator.validate(identifier, self.store.order())
            };
            if !issues.is_empty() {
                let ticket = self.toggles.park(identifier, issues.clone());
                tracing::info!(
                    entry = %identifier,
                    ticket = %ticket,
                    issues = issues.len(),
                    "enable pending decision"
                );
                return Ok(ToggleOutcome::Pending {
                    ticket,
                    identifier: identifier.clone(),
                    issues,
                });
            }
            self.toggles.cancel_for(identifier);
        }

        let input = json!({ "identifier": identifier, "enabled": enabled });
        let result = self
            .commit(&[(identifier.clone(), enabled)])
            .map(|changed| ToggleOutcome::Immediate {
                identifier: identifier.clone(),
                enabled,
                changed,
            });
        let changed = Self::outcome_changed(&result);
        self.record("toggle entry", input, started, changed, result)
    }

    /// Deliver the decision for a pending enable. A ticket resolves once;
    /// unknown tickets are a not-found error and change nothing.
    pub fn resolve_toggle(
        &mut self,
        ticket: &ToggleTicket,
        decision: Decision,
    ) -> Result<ToggleResolution> {
        let started = Instant::now();
        let pending = self.toggles.take(ticket).inspect_err(|e| {
            tracing::warn!(ticket = %ticket, error = %e, "toggle resolution ignored");
        })?;

        if decision == Decision::Cancel {
            tracing::info!(
                entry = %pending.identifier,
                ticket = %ticket,
                "pending enable cancelled"
            );
            return Ok(ToggleResolution {
                ticket: pending.ticket,
                identifier: pending.identifier,
                decision,
                changed: Vec::new(),
            });
        }

        let input = json!({ "ticket": ticket, "decision": decision });
        let result = self.commit(&pending.changes()).map(|changed| ToggleResolution {
            ticket: pending.ticket.clone(),
            identifier: pending.identifier.clone(),
            decision,
            changed,
        });
        let changed = result.as_ref().map_or(true, |r| !r.changed.is_empty());
        self.record("resolve toggle", input, started, changed, result)
    }

    /// Toggle and, when the enable is parked, ask `prompt` and resolve with
    /// its answer. The result reports the entry's flag after the call.
    pub async fn toggle_with_prompt(
        &mut self,
        identifier: &EntryId,
        enabled: bool,
        prompt: &dyn DecisionPrompt,
    ) -> Result<ToggleOutcome> {
        let (ticket, issues) = match self.toggle(identifier, enabled)? {
            ToggleOutcome::Pending { ticket, issues, .. } => (ticket, issues),
            immediate => return Ok(immediate),
        };

        let decision = prompt.decide(identifier, &issues).await;
        let resolution = self.resolve_toggle(&ticket, decision)?;
        Ok(ToggleOutcome::Immediate {
            identifier: resolution.identifier,
            enabled: decision == Decision::Proceed,
            changed: resolution.changed,
        })
    }

    /// Enable or disable every member of a group, and of its descendants when
    /// `recursive`. Enables with validation issues are reported as blocked.
    pub fn set_group_enabled(
        &mut self,
        group: &GroupId,
        enabled: bool,
        recursive: bool,
    ) -> Result<GroupToggleReport> {
        let started = Instant::now();
        self.require_group(group)?;

        let mut groups = vec![group.clone()];
        if recursive {
            groups.extend(self.tree.descendants(group));
        }
        let members: Vec<EntryId> = groups
            .iter()
            .flat_map(|g| self.cache.entries(g).map(|e| e.identifier.clone()))
            .collect();

        let mut changes = Vec::new();
        let mut blocked = Vec::new();
        for identifier in members {
            if !enabled {
                self.toggles.cancel_for(&identifier);
                changes.push((identifier, false));
                continue;
            }
            if self.store.is_enabled(&identifier) != Some(false) {
                continue;
            }
            let issues = self.validator.validate(&identifier, self.store.order());
            if issues.is_empty() {
                changes.push((identifier, true));
            } else {
                blocked.push(BlockedEntry { identifier, issues });
            }
        }

        let input = json!({ "group": group, "enabled": enabled, "recursive": recursive });
        let result = self.commit(&changes).map(|changed| GroupToggleReport {
            group: group.clone(),
            enabled,
            changed,
            blocked,
        });
        let changed = result.as_ref().map_or(true, |r| !r.changed.is_empty());
        self.record("toggle group", input, started, changed, result)
    }

    /// Write enabled flags through the guard, then republish the affected
    /// groups' counters. Counters follow the written flags even when
    /// persisting fails.
    fn commit(&mut self, changes: &[(EntryId, bool)]) -> Result<Vec<EntryId>> {
        let committed = commit_changes(&mut self.store, self.guard.as_mut(), changes)?;
        if !committed.changed.is_empty() {
            let top = self.tree.top_level_id();
            let mut seen = HashSet::new();
            let groups: Vec<GroupId> = committed
                .changed
                .iter()
                .map(|id| {
                    self.cache
                        .group_of(id)
                        .cloned()
                        .unwrap_or_else(|| top.clone())
                })
                .filter(|g| seen.insert(g.clone()))
                .collect();
            self.publish(&groups);
            tracing::info!(count = committed.changed.len(), "enabled flags written");
        }
        committed.into_result()
    }

    fn outcome_changed(result: &Result<ToggleOutcome>) -> bool {
        match result {
            Ok(ToggleOutcome::Immediate { changed, .. }) => !changed.is_empty(),
            Ok(ToggleOutcome::Pending { .. }) => false,
            Err(_) => true,
        }
    }

    // ---- internals ----

    fn require_group(&self, group: &GroupId) -> Result<()> {
        if self.tree.contains(group) {
            Ok(())
        } else {
            tracing::warn!(group = %group, "group not found");
            Err(GroupError::group_not_found(group.as_str()))
        }
    }

    /// Discover a group and set it up for the active mode
    fn convert_group(&mut self, group: &GroupId) -> Result<()> {
        self.discover(group)?;
        match self.modes.mode() {
            PresentationMode::Off => return Ok(()),
            PresentationMode::Tray => {
                self.presentation.set_members_hidden(group, true);
                self.presentation.attach_tray_trigger(group);
            }
            PresentationMode::Accordion => {
                self.presentation.set_members_hidden(group, false);
                self.presentation.attach_reorder_handler(group);
                self.presentation.set_expanded(group, true);
            }
        }
        self.modes.mark_converted(group);
        tracing::debug!(group = %group, mode = %self.modes.mode(), "group converted");
        Ok(())
    }

    fn revert_effects(&mut self, group: &GroupId, state: GroupModeState) {
        match state.mode {
            PresentationMode::Off => {}
            PresentationMode::Tray => {
                if state.tray_open {
                    self.presentation.close_overlay(group);
                }
                self.presentation.detach_tray_trigger(group);
                self.presentation.set_members_hidden(group, false);
            }
            PresentationMode::Accordion => {
                self.presentation.detach_reorder_handler(group);
            }
        }
        tracing::debug!(group = %group, mode = %state.mode, "group reverted");
    }

    /// Republish counters of `groups` and their ancestors
    fn publish(&mut self, groups: &[GroupId]) {
        if groups.is_empty() {
            return;
        }
        Aggregator::new(&self.tree, &self.cache, self.store.order())
            .refresh_many(groups, &mut self.presentation);
    }

    /// Append a mutation record when something changed or failed after
    /// touching state, and hand the result back
    fn record<T: Serialize>(
        &mut self,
        op: &'static str,
        input: Value,
        started: Instant,
        changed: bool,
        result: Result<T>,
    ) -> Result<T> {
        let duration_ms = started.elapsed().as_millis() as u64;
        let (result, record) = Outcome::classify(op, input, duration_ms, changed, result).split();
        if let Some(record) = record {
            self.activity.push(record);
        }
        result
    }
}
