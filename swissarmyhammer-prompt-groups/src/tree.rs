//! Group tree - arena of groups with explicit parent pointers
//!
//! Structure lives here, independent of whatever the presentation layer
//! happens to render. Ancestor propagation walks `parent` links in this arena,
//! never a visual tree.

use crate::error::{GroupError, Result};
use crate::types::{Group, GroupId, GroupKind};
use std::collections::HashMap;

/// Arena of groups keyed by their generated id
#[derive(Debug, Clone)]
pub struct GroupTree {
    groups: HashMap<GroupId, Group>,
    /// Root-level named groups in display order (TopLevel excluded)
    roots: Vec<GroupId>,
}

impl GroupTree {
    /// Create a tree holding only the TopLevel group
    pub fn new(top_level_name: impl Into<String>) -> Self {
        let top = Group {
            id: GroupId::top_level(),
            name: top_level_name.into(),
            kind: GroupKind::TopLevel,
            parent: None,
            children: Vec::new(),
        };
        let mut groups = HashMap::new();
        groups.insert(top.id.clone(), top);
        Self {
            groups,
            roots: Vec::new(),
        }
    }

    /// The singleton TopLevel group
    pub fn top_level_id(&self) -> GroupId {
        GroupId::top_level()
    }

    /// Create a new group with a generated id
    pub fn create_group(
        &mut self,
        name: impl Into<String>,
        parent: Option<&GroupId>,
    ) -> Result<GroupId> {
        let id = GroupId::generate();
        self.restore_group(id.clone(), name, parent)?;
        Ok(id)
    }

    /// Insert a group under a known id (hosts restoring a saved layout)
    pub fn restore_group(
        &mut self,
        id: GroupId,
        name: impl Into<String>,
        parent: Option<&GroupId>,
    ) -> Result<()> {
        if self.groups.contains_key(&id) {
            return Err(GroupError::DuplicateGroup { id: id.to_string() });
        }
        if let Some(parent_id) = parent {
            self.check_parent(parent_id)?;
        }

        let group = Group {
            id: id.clone(),
            name: name.into(),
            kind: if parent.is_some() {
                GroupKind::SubHeader
            } else {
                GroupKind::Regular
            },
            parent: parent.cloned(),
            children: Vec::new(),
        };
        self.groups.insert(id.clone(), group);
        self.attach(&id, parent, None);

        tracing::debug!(group = %id, "created group");
        Ok(())
    }

    /// Change a group's display name. Identity is unaffected.
    pub fn rename_group(&mut self, id: &GroupId, name: impl Into<String>) -> Result<()> {
        let group = self
            .groups
            .get_mut(id)
            .ok_or_else(|| GroupError::group_not_found(id.as_str()))?;
        group.name = name.into();
        Ok(())
    }

    /// Move a group under a new parent (or to the root level)
    pub fn reparent_group(&mut self, id: &GroupId, new_parent: Option<&GroupId>) -> Result<()> {
        if id.is_top_level() {
            return Err(GroupError::invalid_operation("the TopLevel group cannot be moved"));
        }
        if !self.groups.contains_key(id) {
            return Err(GroupError::group_not_found(id.as_str()));
        }
        if let Some(parent_id) = new_parent {
            self.check_parent(parent_id)?;
            if parent_id == id || self.ancestors(parent_id).contains(id) {
                return Err(GroupError::invalid_operation(format!(
                    "moving group {} under {} would create a cycle",
                    id, parent_id
                )));
            }
        }

        self.detach(id);
        if let Some(group) = self.groups.get_mut(id) {
            group.parent = new_parent.cloned();
            group.kind = if new_parent.is_some() {
                GroupKind::SubHeader
            } else {
                GroupKind::Regular
            };
        }
        self.attach(id, new_parent, None);
        Ok(())
    }

    /// Remove a group. Its children take its place under its parent.
    pub fn remove_group(&mut self, id: &GroupId) -> Result<Group> {
        if id.is_top_level() {
            return Err(GroupError::invalid_operation(
                "the TopLevel group cannot be removed",
            ));
        }
        let parent = self
            .groups
            .get(id)
            .ok_or_else(|| GroupError::group_not_found(id.as_str()))?
            .parent
            .clone();

        let slot = self.detach(id);
        let group = self
            .groups
            .remove(id)
            .ok_or_else(|| GroupError::group_not_found(id.as_str()))?;

        for (offset, child) in group.children.iter().enumerate() {
            if let Some(child_group) = self.groups.get_mut(child) {
                child_group.parent = parent.clone();
                child_group.kind = if parent.is_some() {
                    GroupKind::SubHeader
                } else {
                    GroupKind::Regular
                };
            }
            self.attach(child, parent.as_ref(), slot.map(|s| s + offset));
        }

        Ok(group)
    }

    /// Get a group by id
    pub fn get(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    /// Check if a group exists
    pub fn contains(&self, id: &GroupId) -> bool {
        self.groups.contains_key(id)
    }

    /// Display name of a group
    pub fn name(&self, id: &GroupId) -> Option<&str> {
        self.groups.get(id).map(|g| g.name.as_str())
    }

    /// Parent of a group, if it is nested
    pub fn parent_of(&self, id: &GroupId) -> Option<&GroupId> {
        self.groups.get(id).and_then(|g| g.parent.as_ref())
    }

    /// Ordered children of a group
    pub fn children(&self, id: &GroupId) -> &[GroupId] {
        self.groups
            .get(id)
            .map(|g| g.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ancestors of a group, nearest first.
    ///
    /// The walk is bounded by the arena size so a corrupt parent chain ends.
    pub fn ancestors(&self, id: &GroupId) -> Vec<GroupId> {
        let mut result = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if result.len() >= self.groups.len() || result.contains(parent) {
                tracing::warn!(group = %id, "parent chain does not terminate");
                break;
            }
            result.push(parent.clone());
            current = self.parent_of(parent);
        }
        result
    }

    /// Every named group, roots first, each followed by its descendants.
    /// TopLevel is not part of the traversal.
    pub fn depth_first(&self) -> Vec<GroupId> {
        let mut out = Vec::with_capacity(self.groups.len());
        let mut stack: Vec<&GroupId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if out.contains(id) {
                continue;
            }
            out.push(id.clone());
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Every group below `id`, depth first, `id` itself excluded
    pub fn descendants(&self, id: &GroupId) -> Vec<GroupId> {
        let mut out = Vec::new();
        let mut stack: Vec<&GroupId> = self.children(id).iter().rev().collect();
        while let Some(child) = stack.pop() {
            if child == id || out.contains(child) {
                continue;
            }
            out.push(child.clone());
            stack.extend(self.children(child).iter().rev());
        }
        out
    }

    /// Every group including TopLevel (TopLevel first)
    pub fn all_ids(&self) -> Vec<GroupId> {
        let mut ids = vec![self.top_level_id()];
        ids.extend(self.depth_first());
        ids
    }

    /// Root-level named groups in display order
    pub fn roots(&self) -> &[GroupId] {
        &self.roots
    }

    /// Number of groups including TopLevel
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Always false: TopLevel is always present
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn check_parent(&self, parent: &GroupId) -> Result<()> {
        if parent.is_top_level() {
            return Err(GroupError::invalid_operation(
                "the TopLevel group cannot contain child groups",
            ));
        }
        if !self.groups.contains_key(parent) {
            return Err(GroupError::group_not_found(parent.as_str()));
        }
        Ok(())
    }

    /// Unlink a group from its parent's child list (or the roots). Returns the
    /// slot it occupied.
    fn detach(&mut self, id: &GroupId) -> Option<usize> {
        let siblings = match self.parent_of(id).cloned() {
            Some(parent) => match self.groups.get_mut(&parent) {
                Some(p) => &mut p.children,
                None => return None,
            },
            None => &mut self.roots,
        };
        let slot = siblings.iter().position(|c| c == id)?;
        siblings.remove(slot);
        Some(slot)
    }

    fn attach(&mut self, id: &GroupId, parent: Option<&GroupId>, slot: Option<usize>) {
        let siblings = match parent {
            Some(parent) => match self.groups.get_mut(parent) {
                Some(p) => &mut p.children,
                None => return,
            },
            None => &mut self.roots,
        };
        let index = slot.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(index, id.clone());
    }
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new("Ungrouped")
    }
}
