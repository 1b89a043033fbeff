//! Drag and drop through the engine

mod common;

use common::{order_ids, setup_and_scene};
use swissarmyhammer_prompt_groups::test_support::{ids, PresentationEvent};
use swissarmyhammer_prompt_groups::{
    Counts, DropAction, EntryId, GridDrop, GroupError, SourceContainer,
};

#[test_log::test]
fn test_drag_onto_other_group_header() {
    let mut s = setup_and_scene();
    let p7 = EntryId::from("p7");
    let enabled_before = s.engine.get_aggregated_counts(&s.scene).unwrap().enabled;

    s.engine
        .begin_drag(&p7, &s.setup, SourceContainer::Inline)
        .unwrap();
    assert!(s.engine.hover_group(Some(&s.scene)));
    let outcome = s.engine.drop_at(None).unwrap().unwrap();

    assert_eq!(
        outcome.action,
        DropAction::MoveToGroupTop {
            target: s.scene.clone()
        }
    );
    assert_eq!(s.engine.get_aggregated_counts(&s.setup).unwrap().total, 2);
    let scene = s.engine.get_aggregated_counts(&s.scene).unwrap();
    assert_eq!(scene.total, 3);
    // p7 is disabled, so the enabled count does not move
    assert_eq!(scene.enabled, enabled_before);

    let order = order_ids(&s.engine);
    let p7_at = order.iter().position(|id| id == "p7").unwrap();
    assert_eq!(order[p7_at + 1], "c1");
    assert_eq!(order, vec!["p7", "c1", "c2", "s1", "s2", "loose"]);

    assert_eq!(s.engine.cache().group_of(&p7), Some(&s.scene));
    assert_eq!(
        s.engine.presentation().counts(&s.scene),
        Some(Counts::new(1, 3))
    );
    assert_eq!(s.engine.store().persist_count(), 1);
    assert_eq!(s.engine.activity().latest().unwrap().op, "move entry-top");
    assert!(s.guard.is_balanced());
    assert!(s.engine.drag_session().is_none());
}

#[test_log::test]
fn test_promotion_zone_wins_over_header() {
    let mut s = setup_and_scene();
    let p7 = EntryId::from("p7");
    let top = s.engine.top_level_id();

    s.engine
        .begin_drag(&p7, &s.setup, SourceContainer::Inline)
        .unwrap();
    s.engine.hover_group(Some(&s.scene));
    s.engine.set_over_promotion_zone(true);
    let outcome = s.engine.drop_at(None).unwrap().unwrap();

    assert_eq!(
        outcome.action,
        DropAction::Promote {
            target: top.clone()
        }
    );
    assert_eq!(s.engine.cache().group_of(&p7), Some(&top));
    assert_eq!(s.engine.get_aggregated_counts(&s.scene).unwrap().total, 2);
    assert_eq!(s.engine.get_aggregated_counts(&top).unwrap(), Counts::new(1, 2));

    // Inserted right before TopLevel's previous first member
    let order = order_ids(&s.engine);
    assert_eq!(order, vec!["c1", "c2", "s1", "s2", "p7", "loose"]);
}

#[test_log::test]
fn test_grid_drop_in_same_group_reorders() {
    let mut s = setup_and_scene();
    let p7 = EntryId::from("p7");
    let before = s.engine.get_aggregated_counts(&s.setup).unwrap();

    s.engine
        .begin_drag(&p7, &s.setup, SourceContainer::Inline)
        .unwrap();
    let outcome = s
        .engine
        .drop_at(Some(GridDrop {
            group: s.setup.clone(),
            visual_index: 0,
            snapshot: ids(&["p7", "s1", "s2"]),
        }))
        .unwrap()
        .unwrap();

    assert!(matches!(outcome.action, DropAction::Reorder { .. }));
    assert_eq!(
        order_ids(&s.engine),
        vec!["c1", "c2", "p7", "s1", "s2", "loose"]
    );
    assert_eq!(s.engine.get_aggregated_counts(&s.setup).unwrap(), before);
    assert_eq!(s.engine.activity().latest().unwrap().op, "reorder group");
}

#[test_log::test]
fn test_grid_drop_in_other_group_moves_to_index() {
    let mut s = setup_and_scene();
    let p7 = EntryId::from("p7");

    s.engine
        .begin_drag(&p7, &s.setup, SourceContainer::Inline)
        .unwrap();
    s.engine
        .drop_at(Some(GridDrop {
            group: s.scene.clone(),
            visual_index: 1,
            snapshot: ids(&["c1", "p7", "c2"]),
        }))
        .unwrap();

    assert_eq!(
        order_ids(&s.engine),
        vec!["c1", "p7", "c2", "s1", "s2", "loose"]
    );
    let members: Vec<&str> = s
        .engine
        .cache()
        .entries(&s.scene)
        .map(|e| e.identifier.as_str())
        .collect();
    assert_eq!(members, vec!["c1", "p7", "c2"]);
}

#[test_log::test]
fn test_teardown_exactly_once_when_persist_fails() {
    let mut s = setup_and_scene();
    let p7 = EntryId::from("p7");
    s.engine.store_mut().set_fail_persist(true);
    s.engine.presentation_mut().clear_events();

    s.engine
        .begin_drag(&p7, &s.setup, SourceContainer::Inline)
        .unwrap();
    s.engine.hover_group(Some(&s.scene));
    let result = s.engine.drop_at(None);

    assert!(matches!(result, Err(GroupError::Persist { .. })));
    assert!(s.engine.drag_session().is_none());
    let shown = s.engine.presentation();
    assert_eq!(
        shown.count_events(|e| *e == PresentationEvent::PromotionZone(false)),
        1
    );
    assert_eq!(
        shown.count_events(|e| *e == PresentationEvent::Highlight(None)),
        1
    );
    assert!(s.guard.is_balanced());
    assert!(s.engine.activity().latest().unwrap().output["error"].is_string());

    // A second drop has no session and does nothing
    assert!(s.engine.drop_at(None).unwrap().is_none());
    assert_eq!(
        s.engine
            .presentation()
            .count_events(|e| *e == PresentationEvent::PromotionZone(false)),
        1
    );
}

#[test_log::test]
fn test_failed_persist_still_publishes_moved_counts() {
    let mut s = setup_and_scene();
    s.engine.store_mut().set_fail_persist(true);

    let result = s.engine.move_to_group_top(&EntryId::from("p7"), &s.scene);
    assert!(matches!(result, Err(GroupError::Persist { .. })));

    assert_eq!(order_ids(&s.engine)[0], "p7");
    let scene = s.engine.get_aggregated_counts(&s.scene).unwrap();
    assert_eq!(scene, Counts::new(1, 3));
    assert_eq!(s.engine.presentation().counts(&s.scene), Some(scene));
    assert_eq!(
        s.engine.presentation().counts(&s.setup),
        Some(Counts::new(2, 2))
    );
}

#[test_log::test]
fn test_cancel_drag_mutates_nothing() {
    let mut s = setup_and_scene();
    let before = order_ids(&s.engine);

    s.engine
        .begin_drag(&EntryId::from("s1"), &s.setup, SourceContainer::Inline)
        .unwrap();
    s.engine.set_over_promotion_zone(true);
    assert!(s.engine.cancel_drag());
    assert!(!s.engine.cancel_drag());

    assert_eq!(order_ids(&s.engine), before);
    assert_eq!(s.engine.store().persist_count(), 0);
    assert!(s.engine.activity().is_empty());
}

#[test_log::test]
fn test_stale_session_replaced() {
    let mut s = setup_and_scene();
    s.engine
        .begin_drag(&EntryId::from("s1"), &s.setup, SourceContainer::Inline)
        .unwrap();
    s.engine
        .begin_drag(&EntryId::from("c1"), &s.scene, SourceContainer::Inline)
        .unwrap();

    let session = s.engine.drag_session().unwrap();
    assert_eq!(session.dragged, EntryId::from("c1"));
    assert_eq!(
        s.engine
            .presentation()
            .count_events(|e| *e == PresentationEvent::PromotionZone(false)),
        1
    );
}

#[test_log::test]
fn test_hovering_own_header_is_not_highlighted() {
    let mut s = setup_and_scene();
    s.engine
        .begin_drag(&EntryId::from("s1"), &s.setup, SourceContainer::Inline)
        .unwrap();
    s.engine.hover_group(Some(&s.setup));
    assert_eq!(
        s.engine.presentation().events().last(),
        Some(&PresentationEvent::Highlight(None))
    );
}

#[test_log::test]
fn test_refresh_skipped_during_drag() {
    let mut s = setup_and_scene();
    s.engine
        .begin_drag(&EntryId::from("s1"), &s.setup, SourceContainer::Inline)
        .unwrap();
    s.engine
        .presentation_mut()
        .show_entries(&s.setup, &[("s1", "Sky")]);

    s.engine.refresh_all().unwrap();
    s.engine.on_membership_changed(&s.setup).unwrap();
    assert_eq!(s.engine.get_aggregated_counts(&s.setup).unwrap().total, 3);

    s.engine.cancel_drag();
    s.engine.on_membership_changed(&s.setup).unwrap();
    assert_eq!(
        s.engine.get_aggregated_counts(&s.setup).unwrap(),
        Counts::new(1, 1)
    );
}
