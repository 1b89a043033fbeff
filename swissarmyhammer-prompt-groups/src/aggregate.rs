//! Aggregation - recursive enabled/total counts per group
//!
//! Enabled flags are read from the order list handed in at construction, so a
//! counter is never computed from a stale copy across a rendering pass.

use crate::cache::GroupCache;
use crate::presentation::PresentationLayer;
use crate::tree::GroupTree;
use crate::types::{Counts, EntryId, GroupId, OrderEntry};
use std::collections::{HashMap, HashSet};

/// Computes counts over one snapshot of tree, cache and order list
pub struct Aggregator<'a> {
    tree: &'a GroupTree,
    cache: &'a GroupCache,
    enabled: HashMap<&'a EntryId, bool>,
}

impl<'a> Aggregator<'a> {
    pub fn new(tree: &'a GroupTree, cache: &'a GroupCache, order: &'a [OrderEntry]) -> Self {
        let enabled = order.iter().map(|e| (&e.identifier, e.enabled)).collect();
        Self {
            tree,
            cache,
            enabled,
        }
    }

    /// Counts over a group's own entries. Entries missing from the order list
    /// count toward the total but never as enabled.
    pub fn direct_counts(&self, group: &GroupId) -> Counts {
        self.cache
            .entries(group)
            .fold(Counts::default(), |mut acc, entry| {
                acc.total += 1;
                if self.enabled.get(&entry.identifier).copied().unwrap_or(false) {
                    acc.enabled += 1;
                }
                acc
            })
    }

    /// Direct counts plus every descendant group's counts
    pub fn aggregated_counts(&self, group: &GroupId) -> Counts {
        let mut visited = HashSet::new();
        self.aggregate(group, &mut visited)
    }

    fn aggregate<'g>(&'g self, group: &'g GroupId, visited: &mut HashSet<&'g GroupId>) -> Counts {
        if !visited.insert(group) {
            return Counts::default();
        }
        let mut counts = self.direct_counts(group);
        for child in self.tree.children(group) {
            if child.is_top_level() {
                continue;
            }
            counts += self.aggregate(child, visited);
        }
        counts
    }

    /// Publish a group's aggregate and then every ancestor's, nearest first
    pub fn refresh_counts<P>(&self, group: &GroupId, presentation: &mut P)
    where
        P: PresentationLayer + ?Sized,
    {
        presentation.publish_counts(group, self.aggregated_counts(group));
        self.propagate_to_ancestors(group, presentation);
    }

    /// Recompute and republish every ancestor of `group`
    pub fn propagate_to_ancestors<P>(&self, group: &GroupId, presentation: &mut P)
    where
        P: PresentationLayer + ?Sized,
    {
        if group.is_top_level() {
            return;
        }
        for ancestor in self.tree.ancestors(group) {
            presentation.publish_counts(&ancestor, self.aggregated_counts(&ancestor));
        }
    }

    /// Refresh several groups, publishing each shared ancestor once
    pub fn refresh_many<P>(&self, groups: &[GroupId], presentation: &mut P)
    where
        P: PresentationLayer + ?Sized,
    {
        let mut published = HashSet::new();
        for group in groups {
            let chain = std::iter::once(group.clone()).chain(if group.is_top_level() {
                Vec::new()
            } else {
                self.tree.ancestors(group)
            });
            for id in chain {
                if published.insert(id.clone()) {
                    presentation.publish_counts(&id, self.aggregated_counts(&id));
                }
            }
        }
    }
}
