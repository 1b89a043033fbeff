//! Group-level types: Group, GroupKind, Counts

use super::ids::GroupId;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Structural role of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// A named root-level group
    Regular,
    /// The implicit group for entries outside every named group
    TopLevel,
    /// A nested group, shown as a sub-header inside its parent
    SubHeader,
}

/// A named collection of entries, optionally containing nested child groups.
///
/// Members live in the [`GroupCache`](crate::GroupCache), not here: the tree
/// only records structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub kind: GroupKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<GroupId>,
    #[serde(default)]
    pub children: Vec<GroupId>,
}

impl Group {
    /// Check if this is the TopLevel group
    pub fn is_top_level(&self) -> bool {
        self.kind == GroupKind::TopLevel
    }
}

/// Enabled/total pair shown on a group's counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counts {
    pub enabled: usize,
    pub total: usize,
}

impl Counts {
    pub fn new(enabled: usize, total: usize) -> Self {
        Self { enabled, total }
    }

    /// Number of members that are not enabled
    pub fn disabled(&self) -> usize {
        self.total.saturating_sub(self.enabled)
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, rhs: Counts) -> Counts {
        Counts {
            enabled: self.enabled + rhs.enabled,
            total: self.total + rhs.total,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Counts) {
        self.enabled += rhs.enabled;
        self.total += rhs.total;
    }
}

impl Sum for Counts {
    fn sum<I: Iterator<Item = Counts>>(iter: I) -> Counts {
        iter.fold(Counts::default(), Add::add)
    }
}
