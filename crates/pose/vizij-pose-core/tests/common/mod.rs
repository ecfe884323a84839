#![allow(dead_code)]

use vizij_pose_core::{MemoryScene, MirrorTable, TransferDocument};

pub const BIPED: [&str; 3] = ["hand_L", "hand_R", "spine"];

/// Transform objects for a small biped, one set per namespace ("" for none).
pub fn biped(namespaces: &[&str]) -> MemoryScene {
    let mut scene = MemoryScene::new();
    for ns in namespaces {
        add_biped(&mut scene, ns);
    }
    scene
}

pub fn add_biped(scene: &mut MemoryScene, namespace: &str) {
    for name in BIPED {
        scene.add_transform(&qualified(namespace, name));
    }
}

pub fn qualified(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}:{name}")
    }
}

pub fn arm_pose() -> TransferDocument {
    let json = vizij_test_fixtures::poses::json("arm-ik").expect("arm-ik fixture");
    TransferDocument::from_json(&json).expect("arm-ik parses")
}

pub fn biped_table() -> MirrorTable {
    let path = vizij_test_fixtures::mirror_tables::path("biped").expect("biped fixture");
    MirrorTable::read(path).expect("biped table reads")
}

pub fn float(scene: &MemoryScene, object: &str, attr: &str) -> f64 {
    scene
        .value(object, attr)
        .and_then(|v| v.as_f64())
        .unwrap_or_else(|| panic!("{object}.{attr} should be numeric"))
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9
}
