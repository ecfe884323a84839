mod common;

use std::fs;

use common::{arm_pose, biped};
use vizij_pose_core::{
    Config, DocumentError, SceneAdapter, TransferDocument, Value, FORMAT_VERSION,
};

#[test]
fn save_and_read_keep_objects() {
    let mut scene = biped(&["rig"]);
    scene
        .set_attr("rig:hand_L", "rotateZ", &Value::Float(42.5), true)
        .unwrap();
    let names = vec!["rig:hand_L".to_string(), "rig:spine".to_string()];
    let mut doc = TransferDocument::from_objects(&scene, &names).unwrap();
    doc.set_mirror_axis("rig:hand_L", vec![-1, 1, 1]);
    doc.set_description("wave");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("poses").join("wave.json");
    doc.save(&path).unwrap();
    assert_eq!(doc.path(), Some(path.as_path()));

    let read = TransferDocument::read(&path).unwrap();
    assert_eq!(read.objects(), doc.objects());
    assert_eq!(read.object_names(), names);
    assert_eq!(read.attr_value("rig:hand_L", "rotateZ"), Some(&Value::Float(42.5)));
    assert_eq!(read.mirror_axis("rig:hand_L"), Some(&[-1, 1, 1][..]));
    assert_eq!(read.version(), Some(FORMAT_VERSION));
    assert_eq!(read.description(), Some("wave"));
    assert!(read.created_at().is_some());
}

#[test]
fn metadata_is_written_before_objects() {
    let mut doc = arm_pose();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arm.json");
    doc.save(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let metadata = text.find("\"metadata\"").unwrap();
    let objects = text.find("\"objects\"").unwrap();
    assert!(metadata < objects);
}

#[test]
fn save_stamps_configured_version() {
    let cfg = Config {
        format_version: "2.0.0".into(),
        ..Config::default()
    };
    let mut doc = TransferDocument::new();
    let dir = tempfile::tempdir().unwrap();
    doc.save_with(dir.path().join("empty.json"), &cfg).unwrap();
    assert_eq!(doc.version(), Some("2.0.0"));
    assert!(doc.ctime().is_some());
}

#[test]
fn fixture_pose_parses() {
    let doc = arm_pose();
    assert_eq!(doc.object_count(), 3);
    assert_eq!(doc.namespaces(), vec!["rig".to_string()]);
    assert_eq!(doc.attr_type("rig:hand_L", "rotateX"), Some("doubleAngle"));
    assert_eq!(doc.ctime(), Some(1_700_000_000));
    assert_eq!(doc.owner(), Some("fixtures"));
}

#[test]
fn legacy_dict_is_found_without_extension() {
    let dict = vizij_test_fixtures::legacy::dict_path("arm")
        .unwrap()
        .unwrap();
    let doc = TransferDocument::read(dict.with_extension("")).unwrap();
    assert_eq!(doc.path(), Some(dict.as_path()));
    assert_eq!(doc.object_names(), vec!["rig:hand_L", "rig:hand_R"]);
    assert_eq!(doc.attr_value("rig:hand_L", "translateY"), Some(&Value::Float(5.0)));
    assert_eq!(doc.attr_value("rig:hand_L", "visibility"), Some(&Value::Bool(true)));
    assert_eq!(doc.attr_value("rig:hand_L", "ikBlend"), Some(&Value::Int(1)));
    assert_eq!(doc.attr_type("rig:hand_L", "ikBlend"), Some("long"));
    assert_eq!(doc.attr_names("rig:hand_R"), vec!["translateX"]);
}

#[test]
fn legacy_list_has_no_attributes() {
    let list = vizij_test_fixtures::legacy::list_path("arm")
        .unwrap()
        .unwrap();
    let doc = TransferDocument::read(&list).unwrap();
    assert_eq!(doc.object_count(), 3);
    assert!(doc.objects().values().all(|record| record.attrs.is_empty()));
}

#[test]
fn read_errors_are_typed() {
    let dir = tempfile::tempdir().unwrap();

    let missing = TransferDocument::read(dir.path().join("missing")).unwrap_err();
    assert!(matches!(missing, DocumentError::NotFound(_)));

    let txt = dir.path().join("pose.txt");
    fs::write(&txt, "{}").unwrap();
    let unsupported = TransferDocument::read(&txt).unwrap_err();
    assert!(matches!(unsupported, DocumentError::UnsupportedExtension(ext) if ext == "txt"));

    let dict = dir.path().join("evil.dict");
    fs::write(&dict, "{'a': __import__('os')}").unwrap();
    let legacy = TransferDocument::read(&dict).unwrap_err();
    assert!(matches!(legacy, DocumentError::Legacy { .. }));

    let json = dir.path().join("broken.json");
    fs::write(&json, "{\"objects\": [").unwrap();
    assert!(matches!(
        TransferDocument::read(&json).unwrap_err(),
        DocumentError::Json(_)
    ));
}

#[test]
fn edits_bump_revision_and_keep_mirror_axis() {
    let scene = biped(&["rig"]);
    let mut doc = TransferDocument::new();
    doc.add(&scene, "rig:hand_L").unwrap();
    assert!(doc.set_mirror_axis("rig:hand_L", vec![1, -1, 1]));
    assert!(!doc.set_mirror_axis("rig:tail", vec![1, -1, 1]));

    let before = doc.revision();
    doc.add(&scene, "rig:hand_L").unwrap();
    assert!(doc.revision() > before);
    assert_eq!(doc.mirror_axis("rig:hand_L"), Some(&[1, -1, 1][..]));

    let before = doc.revision();
    assert!(doc.remove("rig:tail").is_none());
    assert_eq!(doc.revision(), before);
    assert!(doc.remove("rig:hand_L").is_some());
    assert_eq!(doc.object_count(), 0);
}
