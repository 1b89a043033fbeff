//! Order reconciler - the only writer of the authoritative order list
//!
//! Group-local positions never map directly onto order list indices, so every
//! insertion point is resolved relative to a neighbor entry. Each operation
//! updates the cache of every group it touched before returning; the caller
//! persists and refreshes counts.
//!
//! A missing entry is an inconsistency between views, not a fault: it is
//! logged and that entry is left alone.

use crate::cache::GroupCache;
use crate::tree::GroupTree;
use crate::types::{Entry, EntryId, GroupId, OrderEntry};
use serde::Serialize;
use std::collections::HashSet;

/// What a reconciler call did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    /// Canonical op string ("move entry-top", "move entry-index", "reorder group")
    pub op: &'static str,
    /// Whether the order list changed
    pub changed: bool,
    /// Groups whose membership or sequence changed
    pub affected: Vec<GroupId>,
    /// Order list index the moved entry landed at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted_at: Option<usize>,
    /// Identifiers that could not be located
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<EntryId>,
}

impl Reconciled {
    fn noop(op: &'static str, skipped: Vec<EntryId>) -> Self {
        Self {
            op,
            changed: false,
            affected: Vec::new(),
            inserted_at: None,
            skipped,
        }
    }

    fn moved(op: &'static str, moved: Option<Relocated>, affected: Vec<GroupId>) -> Self {
        Self {
            op,
            changed: moved.is_some_and(|m| m.from != m.index),
            affected,
            inserted_at: moved.map(|m| m.index),
            skipped: Vec::new(),
        }
    }
}

/// Order list index of a moved entry before and after the move
#[derive(Debug, Clone, Copy)]
struct Relocated {
    from: usize,
    index: usize,
}

/// Where the moved entry goes relative to a neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor<'a> {
    Before(&'a EntryId),
    After(&'a EntryId),
    End,
}

/// Borrowed view over the order list, cache and tree for one mutation
pub struct OrderReconciler<'a> {
    order: &'a mut Vec<OrderEntry>,
    cache: &'a mut GroupCache,
    tree: &'a GroupTree,
}

impl<'a> OrderReconciler<'a> {
    pub fn new(
        order: &'a mut Vec<OrderEntry>,
        cache: &'a mut GroupCache,
        tree: &'a GroupTree,
    ) -> Self {
        Self { order, cache, tree }
    }

    /// Move an entry to the top of a group.
    ///
    /// The entry is inserted right before the order entry of the target's
    /// current first member, nested groups' members included, or at the end
    /// of the whole list when the target has no resolvable member.
    pub fn move_to_group_top(&mut self, identifier: &EntryId, target: &GroupId) -> Reconciled {
        const OP: &str = "move entry-top";

        if !self.tree.contains(target) {
            tracing::warn!(group = %target, "move target group not found");
            return Reconciled::noop(OP, Vec::new());
        }
        if self.position(identifier).is_none() {
            tracing::warn!(entry = %identifier, "entry not in order list, move skipped");
            return Reconciled::noop(OP, vec![identifier.clone()]);
        }

        let anchor = self
            .cache
            .flatten(target)
            .into_iter()
            .filter_map(|m| m.identifier().cloned())
            .find(|id| id != identifier && self.position(id).is_some());
        let moved = match &anchor {
            Some(first) => self.relocate(identifier, Anchor::Before(first)),
            None => self.relocate(identifier, Anchor::End),
        };

        let affected = self.move_in_cache(identifier, target, 0);
        tracing::info!(
            entry = %identifier,
            group = %target,
            index = ?moved.map(|m| m.index),
            "moved entry to group top"
        );
        Reconciled::moved(OP, moved, affected)
    }

    /// Move an entry to a visual position inside a group.
    ///
    /// `snapshot` is the destination's member sequence after the drop. The
    /// entry goes before the member now at `visual_index`, after the last
    /// member when the index is past the end, or to the end of the whole
    /// list when no neighbor resolves.
    pub fn move_to_index(
        &mut self,
        identifier: &EntryId,
        target: &GroupId,
        visual_index: usize,
        snapshot: &[EntryId],
    ) -> Reconciled {
        const OP: &str = "move entry-index";

        if !self.tree.contains(target) {
            tracing::warn!(group = %target, "move target group not found");
            return Reconciled::noop(OP, Vec::new());
        }
        if self.position(identifier).is_none() {
            tracing::warn!(entry = %identifier, "entry not in order list, move skipped");
            return Reconciled::noop(OP, vec![identifier.clone()]);
        }

        let neighbors: Vec<&EntryId> = snapshot.iter().filter(|id| *id != identifier).collect();
        let anchor = match neighbors.get(visual_index) {
            Some(next) => Anchor::Before(*next),
            None => match neighbors.last() {
                Some(prev) => Anchor::After(*prev),
                None => Anchor::End,
            },
        };
        let anchor = match anchor {
            Anchor::Before(id) | Anchor::After(id) if self.position(id).is_none() => {
                tracing::debug!(neighbor = %id, "neighbor not in order list, appending");
                Anchor::End
            }
            other => other,
        };

        let moved = self.relocate(identifier, anchor);

        let cache_index = match anchor {
            Anchor::Before(id) => self.cache.index_in_group(target, id),
            Anchor::After(id) => self.cache.index_in_group(target, id).map(|i| i + 1),
            Anchor::End => None,
        }
        .unwrap_or(visual_index);
        let affected = self.move_in_cache(identifier, target, cache_index);
        tracing::info!(
            entry = %identifier,
            group = %target,
            index = ?moved.map(|m| m.index),
            "moved entry to position"
        );
        Reconciled::moved(OP, moved, affected)
    }

    /// Rewrite a group's internal sequence without moving it in the list.
    ///
    /// The positions currently held by the found entries are sorted and
    /// refilled, in ascending order, with those entries in `new_order`.
    pub fn reorder_within_group(&mut self, group: &GroupId, new_order: &[EntryId]) -> Reconciled {
        const OP: &str = "reorder group";

        let mut seen = HashSet::new();
        let mut skipped = Vec::new();
        let mut found: Vec<(usize, OrderEntry)> = Vec::new();
        for id in new_order {
            if !seen.insert(id) {
                continue;
            }
            match self.position(id) {
                Some(pos) => found.push((pos, self.order[pos].clone())),
                None => {
                    tracing::warn!(entry = %id, "entry not in order list, reorder skips it");
                    skipped.push(id.clone());
                }
            }
        }

        let mut slots: Vec<usize> = found.iter().map(|(pos, _)| *pos).collect();
        slots.sort_unstable();

        let mut changed = false;
        for (slot, (_, entry)) in slots.into_iter().zip(found) {
            if self.order[slot] != entry {
                self.order[slot] = entry;
                changed = true;
            }
        }

        let cache_changed = self.cache.rewrite_entry_order(group, new_order);
        let affected = if changed || cache_changed {
            vec![group.clone()]
        } else {
            Vec::new()
        };
        tracing::info!(group = %group, changed, "reordered group");

        Reconciled {
            op: OP,
            changed,
            affected,
            inserted_at: None,
            skipped,
        }
    }

    fn position(&self, identifier: &EntryId) -> Option<usize> {
        self.order.iter().position(|e| &e.identifier == identifier)
    }

    /// Remove an entry and reinsert it at the anchor. Positions are resolved
    /// after the removal.
    fn relocate(&mut self, identifier: &EntryId, anchor: Anchor<'_>) -> Option<Relocated> {
        let from = self.position(identifier)?;
        let entry = self.order.remove(from);
        let index = match anchor {
            Anchor::Before(id) => self.position(id),
            Anchor::After(id) => self.position(id).map(|i| i + 1),
            Anchor::End => None,
        }
        .unwrap_or(self.order.len());
        self.order.insert(index, entry);
        Some(Relocated { from, index })
    }

    /// Take an entry out of every cached list and put it in the target's.
    /// Returns the affected groups, sources first.
    fn move_in_cache(
        &mut self,
        identifier: &EntryId,
        target: &GroupId,
        index: usize,
    ) -> Vec<GroupId> {
        let removed = self.cache.remove_entry(identifier);
        let mut affected: Vec<GroupId> = Vec::new();
        let mut entry = None;
        let mut index = index;
        for r in removed {
            if &r.group == target && r.index < index {
                index -= 1;
            }
            if !affected.contains(&r.group) {
                affected.push(r.group);
            }
            entry.get_or_insert(r.entry);
        }
        let entry = entry.unwrap_or_else(|| Entry::new(identifier.clone(), identifier.as_str()));
        self.cache.insert_entry(target, index, entry);
        if !affected.contains(target) {
            affected.push(target.clone());
        }
        affected
    }
}
