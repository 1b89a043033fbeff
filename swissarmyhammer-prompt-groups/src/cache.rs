//! Group cache - last-known membership per group
//!
//! The presentation layer may throw its elements away at any time. The cache
//! keeps what each group was last seen to contain so counts and moves keep
//! working across those rebuilds. A slot is either absent (never scanned),
//! confirmed empty, or a known ordered member list.
//!
//! A parent's list holds its own entries plus one [`SubHeaderMarker`] per
//! absorbed child; the child's entries are cached under the child's id.
//! [`GroupCache::flatten`] produces the combined view.

use crate::types::{Entry, EntryId, GroupId, Member, SubHeaderMarker};
use std::collections::{HashMap, HashSet};

/// State of one cached group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSlot {
    /// Scanned and found to contain nothing
    ConfirmedEmpty,
    /// Scanned with this ordered member list
    Known(Vec<Member>),
}

impl CacheSlot {
    fn members(&self) -> &[Member] {
        match self {
            Self::ConfirmedEmpty => &[],
            Self::Known(members) => members,
        }
    }
}

/// Entry removed from a cached list by [`GroupCache::remove_entry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedEntry {
    pub group: GroupId,
    pub index: usize,
    pub entry: Entry,
}

/// Process-lifetime membership cache keyed by group id
#[derive(Debug, Clone, Default)]
pub struct GroupCache {
    slots: HashMap<GroupId, CacheSlot>,
    generation: u64,
}

impl GroupCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the slot for a group (`None` = never scanned)
    pub fn slot(&self, group: &GroupId) -> Option<&CacheSlot> {
        self.slots.get(group)
    }

    /// Check if the group has been scanned since the last invalidation
    pub fn is_scanned(&self, group: &GroupId) -> bool {
        self.slots.contains_key(group)
    }

    /// Check if the group is unknown or has no entries of its own
    pub fn has_no_entries(&self, group: &GroupId) -> bool {
        self.entries(group).next().is_none()
    }

    /// Own cached member list of a group (markers included)
    pub fn members(&self, group: &GroupId) -> &[Member] {
        self.slots.get(group).map(CacheSlot::members).unwrap_or(&[])
    }

    /// Own cached entries of a group (markers skipped)
    pub fn entries(&self, group: &GroupId) -> impl Iterator<Item = &Entry> + '_ {
        self.members(group).iter().filter_map(Member::as_entry)
    }

    /// Counter bumped on every full invalidation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record a freshly discovered member list.
    ///
    /// Entries in `members` are evicted from every other group's list first so
    /// an identifier stays in at most one group.
    pub fn store(&mut self, group: &GroupId, members: Vec<Member>) {
        let incoming: HashSet<&EntryId> = members.iter().filter_map(Member::identifier).collect();
        for (id, slot) in self.slots.iter_mut() {
            if id == group {
                continue;
            }
            if let CacheSlot::Known(list) = slot {
                list.retain(|m| m.identifier().is_none_or(|e| !incoming.contains(e)));
            }
        }

        tracing::debug!(group = %group, members = members.len(), "cache write");
        let slot = if members.is_empty() {
            CacheSlot::ConfirmedEmpty
        } else {
            CacheSlot::Known(members)
        };
        self.slots.insert(group.clone(), slot);
    }

    /// Record that a group was scanned and holds nothing
    pub fn mark_confirmed_empty(&mut self, group: &GroupId) {
        self.slots.insert(group.clone(), CacheSlot::ConfirmedEmpty);
    }

    /// Drop one group's slot
    pub fn invalidate(&mut self, group: &GroupId) {
        self.slots.remove(group);
    }

    /// Drop every slot. Every group must be re-discovered afterward.
    pub fn invalidate_all(&mut self) {
        self.slots.clear();
        self.generation += 1;
        tracing::debug!(generation = self.generation, "cache invalidated");
    }

    /// Group whose cached list holds this entry
    pub fn group_of(&self, identifier: &EntryId) -> Option<&GroupId> {
        self.slots.iter().find_map(|(group, slot)| {
            slot.members()
                .iter()
                .any(|m| m.identifier() == Some(identifier))
                .then_some(group)
        })
    }

    /// Cached entry for an identifier, wherever it lives
    pub fn find_entry(&self, identifier: &EntryId) -> Option<&Entry> {
        self.slots
            .values()
            .flat_map(|slot| slot.members().iter())
            .filter_map(Member::as_entry)
            .find(|e| &e.identifier == identifier)
    }

    /// Remove an entry from every cached list it appears in
    pub fn remove_entry(&mut self, identifier: &EntryId) -> Vec<RemovedEntry> {
        let mut removed = Vec::new();
        for (group, slot) in self.slots.iter_mut() {
            let CacheSlot::Known(list) = slot else {
                continue;
            };
            while let Some(index) = list.iter().position(|m| m.identifier() == Some(identifier)) {
                if let Member::Entry(entry) = list.remove(index) {
                    removed.push(RemovedEntry {
                        group: group.clone(),
                        index,
                        entry,
                    });
                }
            }
            if list.is_empty() {
                *slot = CacheSlot::ConfirmedEmpty;
            }
        }
        removed
    }

    /// Insert an entry into a group's own list at `index` (clamped)
    pub fn insert_entry(&mut self, group: &GroupId, index: usize, entry: Entry) {
        let slot = self
            .slots
            .entry(group.clone())
            .or_insert(CacheSlot::ConfirmedEmpty);
        if !matches!(slot, CacheSlot::Known(_)) {
            *slot = CacheSlot::Known(Vec::new());
        }
        if let CacheSlot::Known(list) = slot {
            let index = index.min(list.len());
            list.insert(index, Member::Entry(entry));
        }
    }

    /// Position of an entry inside a group's own list
    pub fn index_in_group(&self, group: &GroupId, identifier: &EntryId) -> Option<usize> {
        self.members(group)
            .iter()
            .position(|m| m.identifier() == Some(identifier))
    }

    /// Rewrite the entry slots of a group's list in `new_order`, leaving
    /// marker slots where they are. Identifiers not cached for the group are
    /// ignored, as are cached entries missing from `new_order`.
    ///
    /// Returns true if the list changed.
    pub fn rewrite_entry_order(&mut self, group: &GroupId, new_order: &[EntryId]) -> bool {
        let Some(CacheSlot::Known(list)) = self.slots.get_mut(group) else {
            return false;
        };

        let mut seen = HashSet::new();
        let ordered: Vec<usize> = new_order
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| list.iter().position(|m| m.identifier() == Some(id)))
            .collect();
        let mut slots: Vec<usize> = ordered.clone();
        slots.sort_unstable();

        let replacement: Vec<Member> = ordered.iter().map(|&i| list[i].clone()).collect();
        let mut changed = false;
        for (slot, member) in slots.into_iter().zip(replacement) {
            if list[slot] != member {
                list[slot] = member;
                changed = true;
            }
        }
        changed
    }

    /// Update the display name of every marker pointing at `child`
    pub fn rename_marker(&mut self, child: &GroupId, name: &str) -> bool {
        let mut renamed = false;
        for slot in self.slots.values_mut() {
            let CacheSlot::Known(list) = slot else {
                continue;
            };
            for member in list.iter_mut() {
                if let Member::SubHeader(marker) = member {
                    if &marker.group == child && marker.name != name {
                        marker.name = name.to_string();
                        renamed = true;
                    }
                }
            }
        }
        renamed
    }

    /// Remove every marker pointing at `child`
    pub fn remove_marker(&mut self, child: &GroupId) -> bool {
        let mut removed = false;
        for slot in self.slots.values_mut() {
            let CacheSlot::Known(list) = slot else {
                continue;
            };
            let before = list.len();
            list.retain(|m| !matches!(m, Member::SubHeader(marker) if &marker.group == child));
            removed |= list.len() != before;
            if list.is_empty() {
                *slot = CacheSlot::ConfirmedEmpty;
            }
        }
        removed
    }

    /// Flattened view of a group: own entries, and for each sub-header marker
    /// the marker followed by the child's flattened members.
    pub fn flatten(&self, group: &GroupId) -> Vec<Member> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.flatten_into(group, &mut out, &mut visited);
        out
    }

    fn flatten_into<'a>(
        &'a self,
        group: &'a GroupId,
        out: &mut Vec<Member>,
        visited: &mut HashSet<&'a GroupId>,
    ) {
        if !visited.insert(group) {
            return;
        }
        for member in self.members(group) {
            out.push(member.clone());
            if let Member::SubHeader(SubHeaderMarker { group: child, .. }) = member {
                self.flatten_into(child, out, visited);
            }
        }
    }
}
