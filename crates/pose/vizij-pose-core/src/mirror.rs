//! MirrorTable: left/right naming conventions and per-object axis flips.
//!
//! A side pattern is a glob over an object's leaf name (namespace and
//! hierarchy stripped): `l_*` is a prefix, `*_L` a suffix, and a pattern with
//! no `*` (e.g. `Left`) is a token anywhere in the leaf. Patterns containing
//! `:` are matched against the namespace-qualified short name instead.
//!
//! Mirror axes are `[x, y, z]` flip flags (`-1` flips). For a translate
//! channel the flag on its own axis decides; a rotate channel flips when
//! exactly one axis is mirrored and it is not that channel's own axis.

use hashbrown::HashSet;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use vizij_api_core::{NodeReference, Value};

use crate::attribute::AttributeHandle;
use crate::config::Config;
use crate::document::{ObjectRecord, TransferDocument};
use crate::error::PoseResult;
use crate::matcher::{match_names, MatchRequest};
use crate::scene::{LoadScope, SceneAdapter};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MirrorTableError {
    #[error("left and right side patterns are both '{0}'")]
    SamePattern(String),
    #[error("no {0} side pattern given or found")]
    MissingSide(&'static str),
    #[error("invalid side pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("'{0}' matches both the left and right side patterns")]
    AmbiguousSide(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Anchor {
    Anywhere,
    Prefix,
    Suffix,
}

/// Candidate markers, most specific first. Scanned template-major.
const LEFT_TEMPLATES: [(&str, Anchor); 7] = [
    ("Left", Anchor::Anywhere),
    ("l_", Anchor::Prefix),
    ("_l", Anchor::Suffix),
    ("left", Anchor::Prefix),
    ("Lf", Anchor::Suffix),
    ("L", Anchor::Prefix),
    ("_L", Anchor::Suffix),
];

const RIGHT_TEMPLATES: [(&str, Anchor); 7] = [
    ("Right", Anchor::Anywhere),
    ("r_", Anchor::Prefix),
    ("_r", Anchor::Suffix),
    ("right", Anchor::Prefix),
    ("Rt", Anchor::Suffix),
    ("R", Anchor::Prefix),
    ("_R", Anchor::Suffix),
];

/// Plane the rig is mirrored across.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorPlane {
    #[default]
    YZ,
    XZ,
    XY,
}

impl MirrorPlane {
    pub fn axis(self) -> Vec<i32> {
        match self {
            MirrorPlane::YZ => vec![-1, 1, 1],
            MirrorPlane::XZ => vec![1, -1, 1],
            MirrorPlane::XY => vec![1, 1, -1],
        }
    }

    pub fn from_axis(axis: &[i32]) -> Option<Self> {
        match axis {
            [-1, 1, 1] => Some(MirrorPlane::YZ),
            [1, -1, 1] => Some(MirrorPlane::XZ),
            [1, 1, -1] => Some(MirrorPlane::XY),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MirrorOption {
    /// Exchange values between sides; center objects are flipped in place.
    #[default]
    Swap,
    LeftToRight,
    RightToLeft,
}

/// A compiled side pattern.
#[derive(Clone, Debug)]
pub struct SidePattern {
    text: String,
    glob: Option<Regex>,
}

impl SidePattern {
    pub fn new(text: &str) -> Result<Self, MirrorTableError> {
        let glob = if text.contains('*') {
            let body = text
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            let re = Regex::new(&format!("^{body}$")).map_err(|e| {
                MirrorTableError::InvalidPattern {
                    pattern: text.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Some(re)
        } else {
            None
        };
        Ok(Self {
            text: text.to_string(),
            glob,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.text.is_empty() {
            return false;
        }
        let node = NodeReference::new(name);
        let target = if self.text.contains(':') {
            node.short_name()
        } else {
            node.leaf_name()
        };
        match &self.glob {
            Some(re) => re.is_match(target),
            None => target.contains(self.text.as_str()),
        }
    }
}

/// Glob-match `name` against a side pattern.
pub fn match_side(name: &str, pattern: &str) -> bool {
    SidePattern::new(pattern)
        .map(|p| p.matches(name))
        .unwrap_or(false)
}

fn find_side(names: &[String], templates: &[(&str, Anchor)]) -> String {
    for (token, anchor) in templates {
        for name in names {
            let node = NodeReference::new(name.as_str());
            let leaf = node.leaf_name();
            let found = match anchor {
                Anchor::Prefix if leaf.starts_with(token) => Some(format!("{token}*")),
                Anchor::Suffix if leaf.ends_with(token) => Some(format!("*{token}")),
                Anchor::Anywhere if leaf.starts_with(token) => Some(format!("{token}*")),
                Anchor::Anywhere if leaf.ends_with(token) => Some(format!("*{token}")),
                Anchor::Anywhere if leaf.contains(token) => Some(token.to_string()),
                _ => None,
            };
            if let Some(side) = found {
                return side;
            }
        }
    }
    String::new()
}

/// First left-side template matching any of `names`; empty when none.
pub fn find_left_side(names: &[String]) -> String {
    find_side(names, &LEFT_TEMPLATES)
}

pub fn find_right_side(names: &[String]) -> String {
    find_side(names, &RIGHT_TEMPLATES)
}

/// Swap the fixed part of `from` for the fixed part of `to` in every
/// hierarchy segment of `name`. Namespaces and separators are left as they
/// are. `None` when nothing changed.
pub fn mirror_name(name: &str, from: &str, to: &str) -> Option<String> {
    let old = from.replace('*', "");
    let new = to.replace('*', "");
    if old.is_empty() {
        return None;
    }
    let prefix = from.ends_with('*');
    let suffix = from.starts_with('*');
    let whole_segment = from.contains(':');

    let segments: Vec<String> = name
        .split('|')
        .map(|segment| {
            let split = match segment.rfind(':') {
                Some(idx) if !whole_segment => idx + 1,
                _ => 0,
            };
            let (ns, leaf) = segment.split_at(split);
            let renamed = if prefix {
                leaf.strip_prefix(old.as_str()).map(|rest| format!("{new}{rest}"))
            } else if suffix {
                leaf.strip_suffix(old.as_str()).map(|rest| format!("{rest}{new}"))
            } else {
                leaf.contains(old.as_str())
                    .then(|| leaf.replacen(old.as_str(), &new, 1))
            };
            format!("{ns}{}", renamed.as_deref().unwrap_or(leaf))
        })
        .collect();

    let mirrored = segments.join("|");
    (mirrored != name).then_some(mirrored)
}

fn axis_index(attr: &str) -> Option<usize> {
    match attr.chars().last()? {
        'X' => Some(0),
        'Y' => Some(1),
        'Z' => Some(2),
        _ => None,
    }
}

/// True when `attr` changes sign under `axis`.
pub fn is_attr_mirrored(attr: &str, axis: &[i32]) -> bool {
    if axis.len() != 3 {
        return false;
    }
    let Some(i) = axis_index(attr) else {
        return false;
    };
    if attr.starts_with("translate") {
        axis[i] == -1
    } else if attr.starts_with("rotate") {
        axis.iter().filter(|a| **a == -1).count() == 1 && axis[i] == 1
    } else {
        false
    }
}

/// Apply the sign flips `axis` implies for `attr`. Compound `translate` /
/// `rotate` values flip per component.
pub fn format_value(attr: &str, value: &Value, axis: &[i32]) -> Value {
    match (attr, value) {
        ("translate" | "rotate", Value::List(items)) if items.len() == 3 => Value::List(
            items
                .iter()
                .zip(["X", "Y", "Z"])
                .map(|(v, suffix)| format_value(&format!("{attr}{suffix}"), v, axis))
                .collect(),
        ),
        _ if is_attr_mirrored(attr, axis) => value.scaled(-1.0),
        _ => value.clone(),
    }
}

/// What [`MirrorTable::apply`] should touch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MirrorRequest {
    pub objects: Vec<String>,
    pub namespaces: Vec<String>,
    pub option: MirrorOption,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Objects (or left/right pairs) visited.
    pub objects: usize,
    pub written: usize,
    pub failed: usize,
}

#[derive(Clone, Debug)]
pub struct MirrorTable {
    left: SidePattern,
    right: SidePattern,
    plane: MirrorPlane,
    axes: IndexMap<String, Vec<i32>>,
    revision: u64,
}

impl MirrorTable {
    pub fn new(left: &str, right: &str) -> Result<Self, MirrorTableError> {
        if left.is_empty() {
            return Err(MirrorTableError::MissingSide("left"));
        }
        if right.is_empty() {
            return Err(MirrorTableError::MissingSide("right"));
        }
        if left == right {
            return Err(MirrorTableError::SamePattern(left.to_string()));
        }
        Ok(Self {
            left: SidePattern::new(left)?,
            right: SidePattern::new(right)?,
            plane: MirrorPlane::default(),
            axes: IndexMap::new(),
            revision: 0,
        })
    }

    /// Build a table for `names`, detecting any side pattern not given.
    /// Every object gets the plane's axis.
    pub fn from_objects(
        names: &[String],
        left: Option<&str>,
        right: Option<&str>,
        plane: MirrorPlane,
    ) -> Result<Self, MirrorTableError> {
        let left = left.map(str::to_string).unwrap_or_else(|| find_left_side(names));
        let right = right
            .map(str::to_string)
            .unwrap_or_else(|| find_right_side(names));
        let mut table = Self::new(&left, &right)?.with_plane(plane);

        for name in names {
            if table.is_left_side(name) && table.is_right_side(name) {
                return Err(MirrorTableError::AmbiguousSide(name.clone()));
            }
            table.set_mirror_axis(name, plane.axis());
        }
        log::debug!(
            "mirror table: left '{}' ({}), right '{}' ({})",
            left,
            table.left_count(names),
            right,
            table.right_count(names)
        );
        Ok(table)
    }

    pub fn with_plane(mut self, plane: MirrorPlane) -> Self {
        self.plane = plane;
        self
    }

    pub fn left_side(&self) -> &str {
        self.left.as_str()
    }

    pub fn right_side(&self) -> &str {
        self.right.as_str()
    }

    pub fn plane(&self) -> MirrorPlane {
        self.plane
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn objects(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(String::as_str)
    }

    pub fn is_left_side(&self, name: &str) -> bool {
        self.left.matches(name)
    }

    pub fn is_right_side(&self, name: &str) -> bool {
        self.right.matches(name)
    }

    pub fn left_count(&self, names: &[String]) -> usize {
        names.iter().filter(|n| self.is_left_side(n)).count()
    }

    pub fn right_count(&self, names: &[String]) -> usize {
        names.iter().filter(|n| self.is_right_side(n)).count()
    }

    /// Opposite-side name of `name`; `None` for center objects.
    pub fn mirror_object(&self, name: &str) -> Option<String> {
        if self.is_left_side(name) {
            mirror_name(name, self.left.as_str(), self.right.as_str())
        } else if self.is_right_side(name) {
            mirror_name(name, self.right.as_str(), self.left.as_str())
        } else {
            None
        }
    }

    pub fn set_mirror_axis(&mut self, name: &str, axis: Vec<i32>) {
        self.axes.insert(name.to_string(), axis);
        self.revision = self.revision.wrapping_add(1);
    }

    /// The object's own axis, else its counterpart's.
    pub fn mirror_axis(&self, name: &str) -> Option<&[i32]> {
        if let Some(axis) = self.axes.get(name) {
            return Some(axis);
        }
        let counterpart = self.mirror_object(name)?;
        self.axes.get(&counterpart).map(Vec::as_slice)
    }

    // ----- persistence -----

    pub fn to_document(&self) -> TransferDocument {
        let mut doc = TransferDocument::new();
        doc.set_metadata("left", self.left.as_str());
        doc.set_metadata("right", self.right.as_str());
        doc.set_metadata("mirrorPlane", self.plane.axis());
        for (name, axis) in &self.axes {
            doc.insert_object(
                name.as_str(),
                ObjectRecord {
                    mirror_axis: Some(axis.clone()),
                    ..ObjectRecord::default()
                },
            );
        }
        doc
    }

    /// `mirrorPlane` may be stored as an axis list or a plane name.
    pub fn from_document(doc: &TransferDocument) -> Result<Self, MirrorTableError> {
        let side = |key: &str| {
            doc.metadata()
                .get(key)
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let plane = doc
            .metadata()
            .get("mirrorPlane")
            .and_then(|v| match v {
                JsonValue::Array(_) => serde_json::from_value::<Vec<i32>>(v.clone())
                    .ok()
                    .and_then(|axis| MirrorPlane::from_axis(&axis)),
                other => serde_json::from_value(other.clone()).ok(),
            })
            .unwrap_or_default();

        let mut table = Self::new(&side("left"), &side("right"))?.with_plane(plane);
        for (name, record) in doc.objects() {
            if let Some(axis) = &record.mirror_axis {
                table.set_mirror_axis(name, axis.clone());
            }
        }
        Ok(table)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> PoseResult<()> {
        self.to_document().save(path)?;
        Ok(())
    }

    pub fn read(path: impl AsRef<std::path::Path>) -> PoseResult<Self> {
        let doc = TransferDocument::read(path)?;
        Ok(Self::from_document(&doc)?)
    }

    // ----- live scene -----

    /// Mirror the live scene in one undo step.
    ///
    /// Table objects are matched onto the request's objects/namespaces. Each
    /// left/right pair is visited once; values are flipped with the source
    /// object's axis. Unsettable attributes are skipped and write failures
    /// counted, never raised.
    pub fn apply(
        &self,
        scene: &mut dyn SceneAdapter,
        cfg: &Config,
        request: &MirrorRequest,
    ) -> PoseResult<MirrorReport> {
        let names: Vec<String> = self.axes.keys().cloned().collect();
        let match_request = MatchRequest {
            dst_objects: request.objects.clone(),
            dst_namespaces: request.namespaces.clone(),
            search_replace: None,
        };

        let mut scope = LoadScope::acquire(scene, false);
        let mut report = MirrorReport::default();
        let mut visited: HashSet<String> = HashSet::new();

        for pair in match_names(&names, &match_request) {
            let dst = pair.destination.name().to_string();
            let counterpart = self.mirror_object(&dst).unwrap_or_else(|| dst.clone());
            if visited.contains(&dst) || visited.contains(&counterpart) {
                continue;
            }
            visited.insert(dst.clone());
            visited.insert(counterpart.clone());

            if !scope.object_exists(&dst) || !scope.object_exists(&counterpart) {
                log::debug!("mirror: skipping '{dst}', counterpart '{counterpart}' is missing");
                continue;
            }
            report.objects += 1;
            let axis = self.mirror_axis(pair.source.name()).map(<[i32]>::to_vec);
            self.transfer(
                &mut *scope,
                cfg,
                (dst.as_str(), counterpart.as_str()),
                axis.as_deref(),
                request.option,
                &mut report,
            );
        }
        Ok(report)
    }

    /// Source/destination roles for one visited pair under `option`.
    fn directions<'n>(
        &self,
        a: &'n str,
        b: &'n str,
        option: MirrorOption,
    ) -> Vec<(&'n str, &'n str)> {
        let center = a == b;
        match option {
            MirrorOption::Swap if center => vec![(a, a)],
            MirrorOption::Swap => vec![(a, b), (b, a)],
            _ if center => Vec::new(),
            MirrorOption::LeftToRight if self.is_left_side(a) => vec![(a, b)],
            MirrorOption::LeftToRight if self.is_left_side(b) => vec![(b, a)],
            MirrorOption::RightToLeft if self.is_right_side(a) => vec![(a, b)],
            MirrorOption::RightToLeft if self.is_right_side(b) => vec![(b, a)],
            _ => Vec::new(),
        }
    }

    fn transfer(
        &self,
        scene: &mut dyn SceneAdapter,
        cfg: &Config,
        pair: (&str, &str),
        axis: Option<&[i32]>,
        option: MirrorOption,
        report: &mut MirrorReport,
    ) {
        let directions = self.directions(pair.0, pair.1, option);
        if directions.is_empty() {
            return;
        }
        let attrs = match scene.list_attrs(pair.0) {
            Ok(attrs) => attrs,
            Err(err) => {
                log::debug!("mirror: cannot list attributes of '{}': {err}", pair.0);
                return;
            }
        };

        for attr in attrs {
            let settable = {
                let view: &dyn SceneAdapter = &*scene;
                [pair.0, pair.1].iter().all(|obj| {
                    AttributeHandle::new(*obj, attr.as_str())
                        .is_settable(view, &cfg.valid_connection_types)
                })
            };
            if !settable {
                continue;
            }

            // Read everything first so a swap sees the pre-mirror values.
            let mut writes = Vec::with_capacity(directions.len());
            for (from, to) in &directions {
                match scene.get_attr(from, &attr) {
                    Ok(value) => {
                        let value = match axis {
                            Some(axis) => format_value(&attr, &value, axis),
                            None => value,
                        };
                        writes.push((*to, value));
                    }
                    Err(err) => log::debug!("mirror: cannot read '{from}.{attr}': {err}"),
                }
            }
            for (object, value) in writes {
                match scene.set_attr(object, &attr, &value, true) {
                    Ok(()) => report.written += 1,
                    Err(err) => {
                        log::debug!("mirror: cannot set '{object}.{attr}': {err}");
                        report.failed += 1;
                    }
                }
            }
        }
    }
}
