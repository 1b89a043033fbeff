//! Drag sessions and drop resolution
//!
//! A drop resolves to exactly one action, by priority:
//! promotion zone, then a hovered header of another group, then the in-grid
//! position.

use crate::reconcile::Reconciled;
use crate::types::{EntryId, GroupId};
use serde::Serialize;

/// Where the drag started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceContainer {
    /// The group's inline member list
    Inline,
    /// A tray overlay
    Overlay,
}

/// One in-flight drag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DragSession {
    pub dragged: EntryId,
    pub source_group: GroupId,
    pub source_container: SourceContainer,
    pub hovered_group: Option<GroupId>,
    pub over_promotion_zone: bool,
}

impl DragSession {
    pub fn new(dragged: EntryId, source_group: GroupId, source_container: SourceContainer) -> Self {
        Self {
            dragged,
            source_group,
            source_container,
            hovered_group: None,
            over_promotion_zone: false,
        }
    }

    /// Decide the single action for a drop.
    ///
    /// `grid` is the in-grid landing position reported by the presentation
    /// layer, if the pointer was over a member grid.
    pub fn resolve(&self, grid: Option<&GridDrop>, top_level: &GroupId) -> DropAction {
        if self.over_promotion_zone {
            return DropAction::Promote {
                target: top_level.clone(),
            };
        }

        if let Some(hovered) = &self.hovered_group {
            if *hovered != self.source_group {
                return DropAction::MoveToGroupTop {
                    target: hovered.clone(),
                };
            }
        }

        match grid {
            Some(drop) if drop.group == self.source_group => DropAction::Reorder {
                group: drop.group.clone(),
                order: drop.snapshot.clone(),
            },
            Some(drop) => DropAction::MoveToIndex {
                target: drop.group.clone(),
                visual_index: drop.visual_index,
                snapshot: drop.snapshot.clone(),
            },
            None => DropAction::Nothing,
        }
    }
}

/// Landing position inside a group's member grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridDrop {
    pub group: GroupId,
    pub visual_index: usize,
    /// The group's entry sequence after the drop
    pub snapshot: Vec<EntryId>,
}

/// The one thing a drop does
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DropAction {
    /// Promotion zone: move to the top of TopLevel
    Promote { target: GroupId },
    /// Another group's header: move to the top of that group
    MoveToGroupTop { target: GroupId },
    /// Same group grid: rewrite the group's internal order
    Reorder { group: GroupId, order: Vec<EntryId> },
    /// Other group grid: move to a visual position there
    MoveToIndex {
        target: GroupId,
        visual_index: usize,
        snapshot: Vec<EntryId>,
    },
    /// Dropped outside any target
    Nothing,
}

/// Result of a completed drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropOutcome {
    pub dragged: EntryId,
    pub action: DropAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled: Option<Reconciled>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DragSession {
        DragSession::new(EntryId::from("p7"), GroupId::from("setup"), SourceContainer::Inline)
    }

    fn grid(group: &str) -> GridDrop {
        GridDrop {
            group: GroupId::from(group),
            visual_index: 1,
            snapshot: vec![EntryId::from("a"), EntryId::from("p7")],
        }
    }

    #[test]
    fn test_promotion_beats_hovered_header() {
        let mut drag = session();
        drag.hovered_group = Some(GroupId::from("scene"));
        drag.over_promotion_zone = true;
        let action = drag.resolve(Some(&grid("scene")), &GroupId::top_level());
        assert_eq!(
            action,
            DropAction::Promote {
                target: GroupId::top_level()
            }
        );
    }

    #[test]
    fn test_other_header_beats_grid() {
        let mut drag = session();
        drag.hovered_group = Some(GroupId::from("scene"));
        let action = drag.resolve(Some(&grid("setup")), &GroupId::top_level());
        assert_eq!(
            action,
            DropAction::MoveToGroupTop {
                target: GroupId::from("scene")
            }
        );
    }

    #[test]
    fn test_own_header_falls_through_to_grid() {
        let mut drag = session();
        drag.hovered_group = Some(GroupId::from("setup"));
        let action = drag.resolve(Some(&grid("setup")), &GroupId::top_level());
        assert!(matches!(action, DropAction::Reorder { .. }));
    }

    #[test]
    fn test_grid_in_other_group_moves_to_index() {
        let action = session().resolve(Some(&grid("scene")), &GroupId::top_level());
        assert!(matches!(action, DropAction::MoveToIndex { visual_index: 1, .. }));
    }

    #[test]
    fn test_nowhere() {
        assert_eq!(session().resolve(None, &GroupId::top_level()), DropAction::Nothing);
    }
}
