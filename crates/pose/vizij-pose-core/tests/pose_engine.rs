mod common;

use common::{approx_eq, arm_pose, biped, biped_table, float};
use vizij_pose_core::{
    AmbiguityPolicy, Config, EngineState, LoadOptions, MemoryScene, PoseEngine, PoseError,
    SceneAdapter, Value,
};

fn only(attrs: &[&str]) -> LoadOptions {
    LoadOptions {
        attrs: attrs.iter().map(|a| a.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn loads_recorded_values_onto_matching_objects() {
    let mut scene = biped(&["rig"]);
    let mut engine = PoseEngine::new(arm_pose());

    let report = engine.load(&mut scene, &LoadOptions::default()).unwrap();
    assert_eq!(report.applied, 14);
    assert_eq!(report.failed, 0);
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(approx_eq(float(&scene, "rig:hand_L", "translateY"), 5.0));
    assert!(approx_eq(float(&scene, "rig:hand_R", "rotateY"), -5.0));
    assert!(approx_eq(float(&scene, "rig:spine", "rotateY"), 15.0));
    assert!(approx_eq(float(&scene, "rig:spine", "scaleX"), 1.0));
}

#[test]
fn blend_moves_part_of_the_way() {
    let mut scene = biped(&["rig"]);
    let mut engine = PoseEngine::new(arm_pose());
    let mut opts = only(&["translateX"]);

    opts.blend = 0.0;
    engine.load(&mut scene, &opts).unwrap();
    assert_eq!(scene.attr_writes(), 0);

    opts.blend = 25.0;
    engine.load(&mut scene, &opts).unwrap();
    assert!(approx_eq(float(&scene, "rig:hand_L", "translateX"), 0.5));
    assert!(approx_eq(float(&scene, "rig:hand_R", "translateX"), -0.25));

    // The baseline is the value seen at resolution, not the last write.
    opts.blend = 50.0;
    engine.load(&mut scene, &opts).unwrap();
    assert!(approx_eq(float(&scene, "rig:hand_L", "translateX"), 1.0));
    assert_eq!(engine.resolve_count(), 1);
}

#[test]
fn resolution_runs_once_per_cache_key() {
    let mut scene = biped(&["rig"]);
    let mut engine = PoseEngine::new(arm_pose());
    let opts = LoadOptions::default();

    engine.load(&mut scene, &opts).unwrap();
    engine.load(&mut scene, &opts).unwrap();
    assert_eq!(engine.resolve_count(), 1);

    engine.load(&mut scene, &only(&["rotateY"])).unwrap();
    assert_eq!(engine.resolve_count(), 2);

    engine.pose_mut().set_description("edited");
    engine.load(&mut scene, &only(&["rotateY"])).unwrap();
    assert_eq!(engine.resolve_count(), 3);

    engine.set_mirror_table(Some(biped_table()));
    engine.load(&mut scene, &only(&["rotateY"])).unwrap();
    assert_eq!(engine.resolve_count(), 4);
}

#[test]
fn namespaces_retarget_the_pose() {
    let mut scene = biped(&["a", "b"]);
    let mut engine = PoseEngine::new(arm_pose());
    let opts = LoadOptions {
        namespaces: vec!["a".into(), "b".into()],
        ..only(&["translateX"])
    };

    let report = engine.load(&mut scene, &opts).unwrap();
    assert_eq!(report.applied, 6);
    for ns in ["a", "b"] {
        assert!(approx_eq(float(&scene, &format!("{ns}:hand_L"), "translateX"), 2.0));
        assert!(approx_eq(float(&scene, &format!("{ns}:spine"), "translateX"), 0.25));
    }
}

#[test]
fn explicit_objects_limit_the_load() {
    let mut scene = biped(&["rig"]);
    let mut engine = PoseEngine::new(arm_pose());
    let opts = LoadOptions {
        objects: vec!["rig:hand_R".into()],
        ..Default::default()
    };

    let report = engine.load(&mut scene, &opts).unwrap();
    assert_eq!(report.applied, 6);
    assert!(approx_eq(float(&scene, "rig:hand_L", "translateX"), 0.0));
    assert!(approx_eq(float(&scene, "rig:hand_R", "translateX"), -1.0));
}

#[test]
fn mirror_load_uses_counterpart_values() {
    let mut scene = biped(&["rig"]);
    let mut engine = PoseEngine::new(arm_pose());
    engine.set_mirror_table(Some(biped_table()));
    let opts = LoadOptions {
        mirror: true,
        ..Default::default()
    };

    engine.load(&mut scene, &opts).unwrap();
    assert!(approx_eq(float(&scene, "rig:hand_R", "translateX"), -2.0));
    assert!(approx_eq(float(&scene, "rig:hand_R", "translateY"), 5.0));
    assert!(approx_eq(float(&scene, "rig:hand_R", "rotateX"), 10.0));
    assert!(approx_eq(float(&scene, "rig:hand_R", "rotateY"), -20.0));
    assert!(approx_eq(float(&scene, "rig:hand_R", "rotateZ"), -30.0));
    assert!(approx_eq(float(&scene, "rig:hand_L", "translateX"), 1.0));
    assert!(approx_eq(float(&scene, "rig:spine", "translateX"), -0.25));

    // Mirroring is a per-load choice; the resolution is shared.
    engine.load(&mut scene, &LoadOptions::default()).unwrap();
    assert!(approx_eq(float(&scene, "rig:hand_R", "translateX"), -1.0));
    assert_eq!(engine.resolve_count(), 1);
}

#[test]
fn mirror_without_table_loads_plainly() {
    let mut scene = biped(&["rig"]);
    let mut engine = PoseEngine::new(arm_pose());
    let opts = LoadOptions {
        mirror: true,
        ..only(&["translateX"])
    };
    engine.load(&mut scene, &opts).unwrap();
    assert!(approx_eq(float(&scene, "rig:hand_L", "translateX"), 2.0));
}

#[test]
fn failed_writes_drop_only_their_slot() {
    let mut scene = biped(&["rig"]);
    scene
        .attribute_mut("rig:hand_L", "rotateZ")
        .unwrap()
        .connection = Some("expression".into());
    let mut engine = PoseEngine::new(arm_pose());

    let report = engine.load(&mut scene, &LoadOptions::default()).unwrap();
    assert_eq!(report.applied, 13);
    assert_eq!(report.failed, 1);
    assert!(approx_eq(float(&scene, "rig:hand_L", "rotateY"), 20.0));

    let report = engine.load(&mut scene, &LoadOptions::default()).unwrap();
    assert_eq!(report.applied, 13);
    assert_eq!(report.failed, 0);
    assert_eq!(report.skipped, 1);
}

#[test]
fn connection_gates_filter_attributes() {
    let mut scene = biped(&["rig"]);
    scene
        .attribute_mut("rig:hand_L", "translateX")
        .unwrap()
        .connection = Some("animCurveTL".into());
    let mut engine = PoseEngine::new(arm_pose());

    let only_connected = LoadOptions {
        only_connected: true,
        ..Default::default()
    };
    let report = engine.load(&mut scene, &only_connected).unwrap();
    assert_eq!(report.applied, 1);

    let ignore_connected = LoadOptions {
        ignore_connected: true,
        ..Default::default()
    };
    let report = engine.load(&mut scene, &ignore_connected).unwrap();
    assert_eq!(report.applied, 13);
}

#[test]
fn keyed_load_keys_at_current_time() {
    let mut scene = biped(&["rig"]);
    scene.set_current_time(24.0);
    let mut engine = PoseEngine::new(arm_pose());
    let opts = LoadOptions {
        key: true,
        ..only(&["translateX"])
    };
    engine.load(&mut scene, &opts).unwrap();
    assert_eq!(
        scene.keyframe_times("rig:hand_L", "translateX").unwrap(),
        vec![24.0]
    );
    assert!(scene.keyframe_times("rig:hand_L", "rotateX").unwrap().is_empty());
}

#[test]
fn host_state_is_restored_after_loads() {
    let mut scene = biped(&["rig"]);
    scene.set_auto_keyframe(true);
    scene.select(&["rig:spine".to_string()]).unwrap();
    let mut engine = PoseEngine::new(arm_pose());
    let opts = LoadOptions {
        clear_selection: true,
        ..Default::default()
    };

    engine.load(&mut scene, &opts).unwrap();
    assert!(scene.auto_keyframe());
    assert_eq!(scene.selection(), vec!["rig:spine".to_string()]);
    assert_eq!(scene.open_undo_chunks(), 0);
    assert_eq!(scene.closed_undo_chunks(), 1);

    let mut empty = MemoryScene::new();
    empty.add_transform("prop");
    empty.set_auto_keyframe(true);
    let mut engine = PoseEngine::new(arm_pose());
    let err = engine.load(&mut empty, &opts).unwrap_err();
    assert!(matches!(err, PoseError::NoMatchFound));
    assert_eq!(engine.state(), EngineState::Failed);
    assert!(empty.auto_keyframe());
    assert_eq!(empty.open_undo_chunks(), 0);
}

#[test]
fn ambiguous_short_names_skip_only_that_object() {
    let mut scene = MemoryScene::new();
    scene.add_transform("|left|a:hand_L");
    scene.add_transform("|right|a:hand_L");
    scene.add_transform("a:spine");

    let mut pose = arm_pose();
    pose.remove("rig:hand_R");
    let opts = LoadOptions {
        namespaces: vec!["a".into()],
        ..only(&["translateX"])
    };

    for policy in [AmbiguityPolicy::Raise, AmbiguityPolicy::FallBackToLongName] {
        let cfg = Config {
            ambiguity_policy: policy,
            ..Config::default()
        };
        let mut engine = PoseEngine::with_config(cfg, pose.clone());
        let report = engine.load(&mut scene, &opts).unwrap();
        assert_eq!(report.applied, 1, "{policy:?}");
        assert!(approx_eq(float(&scene, "a:spine", "translateX"), 0.25));
        assert!(approx_eq(float(&scene, "|left|a:hand_L", "translateX"), 0.0));
        assert!(approx_eq(float(&scene, "|right|a:hand_L", "translateX"), 0.0));
    }
}

#[test]
fn leading_colon_names_the_root_namespace() {
    let mut scene = biped(&[""]);
    let mut engine = PoseEngine::new(arm_pose());
    for root in [":", ""] {
        let opts = LoadOptions {
            namespaces: vec![root.into()],
            ..only(&["translateX"])
        };
        let report = engine.load(&mut scene, &opts).unwrap();
        assert_eq!(report.applied, 3, "namespace {root:?}");
        assert!(approx_eq(float(&scene, "hand_L", "translateX"), 2.0));
        assert!(approx_eq(float(&scene, "spine", "translateX"), 0.25));
    }
}

#[test]
fn select_picks_matched_live_objects() {
    let mut scene = biped(&["rig"]);
    let engine = PoseEngine::new(arm_pose());
    let selected = engine.select(&mut scene, &[], &[]).unwrap();
    assert_eq!(selected, vec!["rig:hand_L", "rig:hand_R", "rig:spine"]);
    assert_eq!(scene.selection(), selected);

    let err = engine
        .select(&mut scene, &[], &["missing".to_string()])
        .unwrap_err();
    assert!(matches!(err, PoseError::NamespaceNotFound(_)));
}

#[test]
fn recorded_values_feed_the_cache() {
    let mut scene = biped(&["rig"]);
    let mut engine = PoseEngine::new(arm_pose());
    engine.load(&mut scene, &only(&["rotateX"])).unwrap();

    let resolved: Vec<_> = engine.resolved().collect();
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].object().name(), "rig:hand_L");
    assert_eq!(resolved[0].source.cached_value(), Some(&Value::Float(10.0)));
    assert!(resolved[0].mirror_value.is_none());
}
