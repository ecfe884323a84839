//! TransferDocument: a snapshot of object attribute values, plus free-form
//! metadata, persisted as one JSON document.
//!
//! On disk (`metadata` always precedes `objects`):
//! ```json
//! {
//!   "metadata": { "version": "1.0.0", "user": "ana", "ctime": "1700000000" },
//!   "objects": {
//!     "ns:hand_L": {
//!       "attrs": { "translateX": { "type": "doubleLinear", "value": 1.5 } },
//!       "mirrorAxis": [-1, 1, 1]
//!     }
//!   }
//! }
//! ```
//! Older `.dict` and `.list` layouts are read through [`legacy`].

pub mod legacy;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use vizij_api_core::{NodeReference, Value};

use crate::config::Config;
use crate::scene::{SceneAdapter, SceneResult};

pub use legacy::LegacyError;

/// Stamped into `metadata.version` by default.
pub const FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read legacy document {}: {source}", .path.display())]
    Legacy {
        path: PathBuf,
        #[source]
        source: LegacyError,
    },
    #[error("unsupported document extension '{0}'")]
    UnsupportedExtension(String),
    #[error("no document at {} or any sibling extension", .0.display())]
    NotFound(PathBuf),
}

/// Recorded type and value of one attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttrRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(default)]
    pub attrs: IndexMap<String, AttrRecord>,
    #[serde(rename = "mirrorAxis", default, skip_serializing_if = "Option::is_none")]
    pub mirror_axis: Option<Vec<i32>>,
}

#[derive(Serialize, Deserialize)]
struct DocumentData {
    #[serde(default)]
    metadata: IndexMap<String, JsonValue>,
    #[serde(default)]
    objects: IndexMap<String, ObjectRecord>,
}

#[derive(Clone, Debug, Default)]
pub struct TransferDocument {
    path: Option<PathBuf>,
    metadata: IndexMap<String, JsonValue>,
    objects: IndexMap<String, ObjectRecord>,
    revision: u64,
}

impl TransferDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the keyable attributes of `names` as they are right now.
    pub fn from_objects(scene: &dyn SceneAdapter, names: &[String]) -> SceneResult<Self> {
        let mut doc = Self::new();
        for name in names {
            doc.add(scene, name)?;
        }
        Ok(doc)
    }

    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let data: DocumentData = serde_json::from_str(text)?;
        Ok(Self {
            metadata: data.metadata,
            objects: data.objects,
            ..Self::default()
        })
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        let data = DocumentData {
            metadata: self.metadata.clone(),
            objects: self.objects.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    // ----- objects -----

    /// Record (or re-record) one object from the scene.
    pub fn add(&mut self, scene: &dyn SceneAdapter, name: &str) -> SceneResult<()> {
        let mut record = ObjectRecord::default();
        for attr in scene.list_attrs(name)? {
            let type_name = scene.attr_type(name, &attr)?;
            let value = scene.get_attr(name, &attr)?;
            record.attrs.insert(attr, AttrRecord { type_name, value });
        }
        if let Some(previous) = self.objects.get(name) {
            record.mirror_axis = previous.mirror_axis.clone();
        }
        self.insert_object(name, record);
        Ok(())
    }

    pub fn insert_object(&mut self, name: impl Into<String>, record: ObjectRecord) {
        self.objects.insert(name.into(), record);
        self.touch();
    }

    pub fn remove(&mut self, name: &str) -> Option<ObjectRecord> {
        let removed = self.objects.shift_remove(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn object(&self, name: &str) -> Option<&ObjectRecord> {
        self.objects.get(name)
    }

    pub fn objects(&self) -> &IndexMap<String, ObjectRecord> {
        &self.objects
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn attr_names(&self, name: &str) -> Vec<String> {
        self.objects
            .get(name)
            .map(|r| r.attrs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn attr_type(&self, name: &str, attr: &str) -> Option<&str> {
        self.attr_record(name, attr).map(|r| r.type_name.as_str())
    }

    pub fn attr_value(&self, name: &str, attr: &str) -> Option<&Value> {
        self.attr_record(name, attr).map(|r| &r.value)
    }

    fn attr_record(&self, name: &str, attr: &str) -> Option<&AttrRecord> {
        self.objects.get(name)?.attrs.get(attr)
    }

    pub fn mirror_axis(&self, name: &str) -> Option<&[i32]> {
        self.objects.get(name)?.mirror_axis.as_deref()
    }

    /// Returns false when the object is not recorded.
    pub fn set_mirror_axis(&mut self, name: &str, axis: Vec<i32>) -> bool {
        match self.objects.get_mut(name) {
            Some(record) => {
                record.mirror_axis = Some(axis);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Distinct namespaces of the recorded objects, in record order.
    pub fn namespaces(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in self.objects.keys() {
            let ns = NodeReference::new(name.as_str()).namespace().to_string();
            if !out.contains(&ns) {
                out.push(ns);
            }
        }
        out
    }

    // ----- metadata -----

    pub fn metadata(&self) -> &IndexMap<String, JsonValue> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.metadata.insert(key.into(), value.into());
        self.touch();
    }

    pub fn owner(&self) -> Option<&str> {
        self.metadata.get("user").and_then(JsonValue::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.get("description").and_then(JsonValue::as_str)
    }

    pub fn set_description(&mut self, text: &str) {
        self.set_metadata("description", text);
    }

    pub fn version(&self) -> Option<&str> {
        self.metadata.get("version").and_then(JsonValue::as_str)
    }

    /// Creation time in unix seconds; accepts a number or a numeric string.
    pub fn ctime(&self) -> Option<i64> {
        match self.metadata.get("ctime")? {
            JsonValue::String(s) => s.parse::<f64>().ok().map(|t| t as i64),
            JsonValue::Number(n) => n.as_f64().map(|t| t as i64),
            _ => None,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.ctime()?, 0)
    }

    /// Bumped on every change; lets callers detect stale derived data.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Where the document was last read from or saved to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // ----- persistence -----

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        self.save_with(path, &Config::default())
    }

    /// Stamp `user`, `ctime` and `version`, then write pretty JSON, creating
    /// parent directories as needed.
    pub fn save_with(&mut self, path: impl AsRef<Path>, cfg: &Config) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        self.metadata.insert("user".into(), user.into());
        self.metadata
            .insert("ctime".into(), Utc::now().timestamp().to_string().into());
        self.metadata
            .insert("version".into(), cfg.format_version.clone().into());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DocumentError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = self.to_json()?;
        fs::write(path, text).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("saved {} objects to {}", self.objects.len(), path.display());
        self.path = Some(path.to_path_buf());
        self.touch();
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        Self::read_with(path, &Config::default())
    }

    /// Read a document, choosing the parser by extension. A missing path is
    /// retried with each of `cfg.probe_extensions` in turn.
    pub fn read_with(path: impl AsRef<Path>, cfg: &Config) -> Result<Self, DocumentError> {
        let path = resolve_path(path.as_ref(), &cfg.probe_extensions)?;
        let text = fs::read_to_string(&path).map_err(|source| DocumentError::Io {
            path: path.clone(),
            source,
        })?;
        let legacy_err = |source| DocumentError::Legacy {
            path: path.clone(),
            source,
        };

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let mut doc = match ext {
            "json" => Self::from_json(&text)?,
            "dict" => Self {
                objects: legacy::parse_dict(&text).map_err(legacy_err)?,
                ..Self::default()
            },
            "list" => Self {
                objects: legacy::parse_list(&text)
                    .map_err(legacy_err)?
                    .into_iter()
                    .map(|name| (name, ObjectRecord::default()))
                    .collect(),
                ..Self::default()
            },
            other => return Err(DocumentError::UnsupportedExtension(other.to_string())),
        };

        log::info!("read {} objects from {}", doc.objects.len(), path.display());
        doc.path = Some(path);
        doc.touch();
        Ok(doc)
    }
}

fn resolve_path(path: &Path, probe_extensions: &[String]) -> Result<PathBuf, DocumentError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    probe_extensions
        .iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| DocumentError::NotFound(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;

    #[test]
    fn metadata_is_written_first() {
        let mut doc = TransferDocument::new();
        doc.insert_object("hand", ObjectRecord::default());
        doc.set_description("test");
        let text = doc.to_json().unwrap();
        let meta = text.find("\"metadata\"").unwrap();
        let objects = text.find("\"objects\"").unwrap();
        assert!(meta < objects);
    }

    #[test]
    fn mirror_axis_is_optional() {
        let doc = TransferDocument::from_json(
            r#"{"objects": {"a": {"attrs": {}}, "b": {"attrs": {}, "mirrorAxis": [-1, 1, 1]}}}"#,
        )
        .unwrap();
        assert_eq!(doc.mirror_axis("a"), None);
        assert_eq!(doc.mirror_axis("b"), Some(&[-1, 1, 1][..]));
        assert!(doc.metadata().is_empty());
        assert!(!doc.to_json().unwrap().contains("null"));
    }

    #[test]
    fn snapshot_keeps_attr_order_and_axis() {
        let mut scene = MemoryScene::new();
        scene.add_transform("ns:hand");
        let mut doc = TransferDocument::from_objects(&scene, &["ns:hand".to_string()]).unwrap();
        assert_eq!(doc.attr_names("ns:hand")[..3], ["translateX", "rotateX", "scaleX"]);
        assert_eq!(doc.attr_type("ns:hand", "rotateX"), Some("doubleAngle"));

        assert!(doc.set_mirror_axis("ns:hand", vec![-1, 1, 1]));
        scene.set_attr("ns:hand", "translateX", &Value::Float(3.0), true).unwrap();
        doc.add(&scene, "ns:hand").unwrap();
        assert_eq!(doc.attr_value("ns:hand", "translateX"), Some(&Value::Float(3.0)));
        assert_eq!(doc.mirror_axis("ns:hand"), Some(&[-1, 1, 1][..]));
    }

    #[test]
    fn revision_tracks_changes() {
        let mut doc = TransferDocument::new();
        let r0 = doc.revision();
        doc.insert_object("a", ObjectRecord::default());
        assert!(doc.revision() > r0);
        let r1 = doc.revision();
        assert!(doc.remove("missing").is_none());
        assert_eq!(doc.revision(), r1);
        assert!(!doc.set_mirror_axis("missing", vec![1]));
        assert_eq!(doc.revision(), r1);
    }

    #[test]
    fn ctime_accepts_string_or_number() {
        let mut doc = TransferDocument::new();
        doc.set_metadata("ctime", "1700000000");
        assert_eq!(doc.ctime(), Some(1_700_000_000));
        doc.set_metadata("ctime", 1_700_000_001);
        assert_eq!(doc.ctime(), Some(1_700_000_001));
        assert_eq!(doc.created_at().unwrap().timestamp(), 1_700_000_001);
    }

    #[test]
    fn namespaces_are_distinct() {
        let mut doc = TransferDocument::new();
        for name in ["a:hand", "a:foot", "|grp|b:hand", "head"] {
            doc.insert_object(name, ObjectRecord::default());
        }
        assert_eq!(doc.namespaces(), vec!["a", "b", ""]);
    }
}
