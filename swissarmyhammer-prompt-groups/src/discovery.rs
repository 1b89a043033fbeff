//! Membership discovery
//!
//! Policy, in order:
//! 1. Member elements currently shown for the group are authoritative and
//!    overwrite the cache. Elements without an identifier are skipped.
//! 2. Child groups shown inside it are discovered recursively and spliced in as
//!    a sub-header marker followed by the child's members. Such children are
//!    absorbed and must not open a presentation of their own.
//! 3. Nothing shown but a known cache slot: return the cached list.
//! 4. Otherwise the group is recorded as confirmed empty.

use crate::cache::{CacheSlot, GroupCache};
use crate::error::{GroupError, Result};
use crate::presentation::{PresentationLayer, PresentedElement};
use crate::tree::GroupTree;
use crate::types::{Entry, GroupId, Member, SubHeaderMarker};
use serde::Serialize;
use std::collections::HashSet;

/// Where a discovery result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    /// Read from the live presentation layer and written to the cache
    Presentation,
    /// Nothing shown; the stale cached list was returned
    Cache,
    /// Nothing shown and nothing cached
    ConfirmedEmpty,
}

/// Result of discovering one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub group: GroupId,
    /// Flattened members: own entries, markers, and absorbed children's members
    pub members: Vec<Member>,
    pub source: DiscoverySource,
    /// Children absorbed into this group's discovery, at any depth
    pub absorbed: Vec<GroupId>,
    /// Groups whose cache slot was overwritten by this pass
    pub written: Vec<GroupId>,
}

impl Discovery {
    /// Number of entries in the flattened member list
    pub fn entry_count(&self) -> usize {
        self.members.iter().filter(|m| !m.is_marker()).count()
    }
}

/// Discover a group's members, writing through to the cache
pub fn discover<P>(
    tree: &GroupTree,
    cache: &mut GroupCache,
    presentation: &P,
    group: &GroupId,
) -> Result<Discovery>
where
    P: PresentationLayer + ?Sized,
{
    if !tree.contains(group) {
        return Err(GroupError::group_not_found(group.as_str()));
    }

    let mut pass = Pass {
        tree,
        cache,
        presentation,
        visited: HashSet::new(),
        absorbed: Vec::new(),
        written: Vec::new(),
    };
    let (members, source) = pass.scan(group);

    tracing::debug!(
        group = %group,
        source = ?source,
        members = members.len(),
        absorbed = pass.absorbed.len(),
        "discovered group"
    );

    Ok(Discovery {
        group: group.clone(),
        members,
        source,
        absorbed: pass.absorbed,
        written: pass.written,
    })
}

struct Pass<'a, P: ?Sized> {
    tree: &'a GroupTree,
    cache: &'a mut GroupCache,
    presentation: &'a P,
    visited: HashSet<GroupId>,
    absorbed: Vec<GroupId>,
    written: Vec<GroupId>,
}

impl<P> Pass<'_, P>
where
    P: PresentationLayer + ?Sized,
{
    fn scan(&mut self, group: &GroupId) -> (Vec<Member>, DiscoverySource) {
        self.visited.insert(group.clone());

        let mut own = Vec::new();
        let mut flat = Vec::new();
        let mut exposed = false;

        for element in self.presentation.elements(group) {
            match element {
                PresentedElement::Entry {
                    identifier: Some(identifier),
                    display_name,
                } => {
                    exposed = true;
                    let member = Member::Entry(Entry::new(identifier, display_name));
                    own.push(member.clone());
                    flat.push(member);
                }
                PresentedElement::Entry {
                    identifier: None,
                    display_name,
                } => {
                    tracing::debug!(
                        group = %group,
                        name = %display_name,
                        "skipping element without identifier"
                    );
                }
                PresentedElement::ChildGroup(child) => {
                    if self.tree.parent_of(&child) != Some(group) {
                        tracing::warn!(
                            group = %group,
                            child = %child,
                            "presented child is not a child of this group"
                        );
                        continue;
                    }
                    if self.visited.contains(&child) {
                        tracing::warn!(
                            group = %group,
                            child = %child,
                            "child group presented twice"
                        );
                        continue;
                    }
                    exposed = true;

                    let marker = Member::SubHeader(SubHeaderMarker {
                        name: self.tree.name(&child).unwrap_or_default().to_string(),
                        group: child.clone(),
                    });
                    let (child_members, _) = self.scan(&child);
                    own.push(marker.clone());
                    flat.push(marker);
                    flat.extend(child_members);
                    self.absorbed.push(child);
                }
            }
        }

        if !exposed {
            return match self.cache.slot(group) {
                Some(CacheSlot::Known(_)) => (self.cache.flatten(group), DiscoverySource::Cache),
                _ => {
                    self.cache.mark_confirmed_empty(group);
                    (Vec::new(), DiscoverySource::ConfirmedEmpty)
                }
            };
        }

        self.cache.store(group, own);
        self.written.push(group.clone());
        (flat, DiscoverySource::Presentation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryId;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Shown(HashMap<GroupId, Vec<PresentedElement>>);

    impl PresentationLayer for Shown {
        fn elements(&self, group: &GroupId) -> Vec<PresentedElement> {
            self.0.get(group).cloned().unwrap_or_default()
        }
    }

    fn names(members: &[Member]) -> Vec<String> {
        members
            .iter()
            .map(|m| match m {
                Member::Entry(e) => e.identifier.to_string(),
                Member::SubHeader(s) => format!("#{}", s.name),
            })
            .collect()
    }

    #[test]
    fn test_presentation_is_authoritative() {
        let mut tree = GroupTree::default();
        let g = tree.create_group("Setup", None).unwrap();
        let mut cache = GroupCache::new();
        let mut shown = Shown::default();
        shown.0.insert(
            g.clone(),
            vec![
                PresentedElement::entry("p1", "One"),
                PresentedElement::Entry {
                    identifier: None,
                    display_name: "decoration".into(),
                },
                PresentedElement::entry("p2", "Two"),
            ],
        );

        let found = discover(&tree, &mut cache, &shown, &g).unwrap();
        assert_eq!(found.source, DiscoverySource::Presentation);
        assert_eq!(names(&found.members), vec!["p1", "p2"]);
        assert_eq!(found.written, vec![g.clone()]);
        assert_eq!(cache.entries(&g).count(), 2);
    }

    #[test]
    fn test_child_groups_are_absorbed() {
        let mut tree = GroupTree::default();
        let parent = tree.create_group("Story", None).unwrap();
        let child = tree.create_group("Setup", Some(&parent)).unwrap();
        let mut cache = GroupCache::new();
        let mut shown = Shown::default();
        shown.0.insert(
            parent.clone(),
            vec![
                PresentedElement::entry("p1", "One"),
                PresentedElement::ChildGroup(child.clone()),
            ],
        );
        shown
            .0
            .insert(child.clone(), vec![PresentedElement::entry("c1", "Child one")]);

        let found = discover(&tree, &mut cache, &shown, &parent).unwrap();
        assert_eq!(names(&found.members), vec!["p1", "#Setup", "c1"]);
        assert_eq!(found.absorbed, vec![child.clone()]);
        assert_eq!(found.entry_count(), 2);

        // The parent owns only its own entry; the child's entry is cached under the child
        assert_eq!(cache.entries(&parent).count(), 1);
        assert_eq!(cache.group_of(&EntryId::from("c1")), Some(&child));
    }

    #[test]
    fn test_stale_cache_is_preferred_when_nothing_shown() {
        let mut tree = GroupTree::default();
        let g = tree.create_group("Setup", None).unwrap();
        let mut cache = GroupCache::new();
        let mut shown = Shown::default();
        shown
            .0
            .insert(g.clone(), vec![PresentedElement::entry("p1", "One")]);
        discover(&tree, &mut cache, &shown, &g).unwrap();

        shown.0.clear();
        let found = discover(&tree, &mut cache, &shown, &g).unwrap();
        assert_eq!(found.source, DiscoverySource::Cache);
        assert_eq!(names(&found.members), vec!["p1"]);
        assert!(found.written.is_empty());
    }

    #[test]
    fn test_confirmed_empty() {
        let mut tree = GroupTree::default();
        let g = tree.create_group("Empty", None).unwrap();
        let mut cache = GroupCache::new();

        let found = discover(&tree, &mut cache, &Shown::default(), &g).unwrap();
        assert_eq!(found.source, DiscoverySource::ConfirmedEmpty);
        assert_eq!(cache.slot(&g), Some(&CacheSlot::ConfirmedEmpty));
    }

    #[test]
    fn test_foreign_child_is_skipped() {
        let mut tree = GroupTree::default();
        let a = tree.create_group("A", None).unwrap();
        let b = tree.create_group("B", None).unwrap();
        let mut cache = GroupCache::new();
        let mut shown = Shown::default();
        shown
            .0
            .insert(a.clone(), vec![PresentedElement::ChildGroup(b.clone())]);

        let found = discover(&tree, &mut cache, &shown, &a).unwrap();
        assert!(found.absorbed.is_empty());
        assert_eq!(found.source, DiscoverySource::ConfirmedEmpty);
    }

    #[test]
    fn test_unknown_group() {
        let tree = GroupTree::default();
        let mut cache = GroupCache::new();
        let result = discover(&tree, &mut cache, &Shown::default(), &GroupId::from("nope"));
        assert!(matches!(result, Err(GroupError::GroupNotFound { .. })));
    }
}
