//! Shared fixtures for integration tests

#![allow(dead_code)]

use swissarmyhammer_prompt_groups::test_support::{
    order, RecordingGuard, ScriptedPresentation, ScriptedValidator,
};
use swissarmyhammer_prompt_groups::{GroupId, GroupsConfig, InMemoryOrderStore, PromptGroups};

pub type Engine = PromptGroups<InMemoryOrderStore, ScriptedPresentation>;

/// Two root groups and one loose entry:
///
/// ```text
/// order:  c1+ c2- s1+ s2+ p7- loose+
/// Setup:  s1 s2 p7
/// Scene:  c1 c2
/// top:    loose
/// ```
pub struct Scenario {
    pub engine: Engine,
    pub setup: GroupId,
    pub scene: GroupId,
    pub guard: RecordingGuard,
    pub validator: ScriptedValidator,
}

pub fn setup_and_scene() -> Scenario {
    setup_and_scene_with(GroupsConfig::default())
}

pub fn setup_and_scene_with(config: GroupsConfig) -> Scenario {
    let store = InMemoryOrderStore::with_order(
        "chat",
        order(&[
            ("c1", true),
            ("c2", false),
            ("s1", true),
            ("s2", true),
            ("p7", false),
            ("loose", true),
        ]),
    );
    let guard = RecordingGuard::new();
    let validator = ScriptedValidator::new();
    let mut engine = PromptGroups::new(config, store, ScriptedPresentation::new())
        .with_mutation_guard(guard.clone())
        .with_validator(validator.clone());

    let setup = engine.create_group("Setup", None).unwrap();
    let scene = engine.create_group("Scene", None).unwrap();
    let top = engine.top_level_id();
    let shown = engine.presentation_mut();
    shown.show_entries(&setup, &[("s1", "Sky"), ("s2", "Sea"), ("p7", "Port")]);
    shown.show_entries(&scene, &[("c1", "Cabin"), ("c2", "Cellar")]);
    shown.show_entries(&top, &[("loose", "Loose")]);

    engine.initialize().unwrap();
    Scenario {
        engine,
        setup,
        scene,
        guard,
        validator,
    }
}

/// Identifiers of the active order list, in order
pub fn order_ids(engine: &Engine) -> Vec<String> {
    engine
        .store()
        .identifiers()
        .into_iter()
        .map(str::to_string)
        .collect()
}
