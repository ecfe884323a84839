//! Scene adapter: the only boundary between the pose core and a host
//! application's scene graph.
//!
//! Hosts implement [`SceneAdapter`] and pass it into the matcher, attribute
//! handles and [`crate::PoseEngine`] calls. [`MemoryScene`] is a complete
//! in-memory implementation used by tests and tooling.

pub mod memory;

pub use memory::{MemoryAttribute, MemoryKey, MemoryScene};

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vizij_api_core::Value;

/// Errors reported by a scene adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("object '{0}' does not exist")]
    ObjectNotFound(String),
    #[error("more than one object matches '{0}'")]
    AmbiguousName(String),
    #[error("attribute '{0}' does not exist")]
    AttributeNotFound(String),
    #[error("attribute '{0}' is locked")]
    Locked(String),
    #[error("attribute '{0}' is driven by an incoming connection")]
    Connected(String),
    #[error("cannot set '{attr}': {reason}")]
    InvalidValue { attr: String, reason: String },
    #[error("no keyframe on '{attr}' at time {time}")]
    NoKeyframe { attr: String, time: f64 },
    #[error("{0}")]
    Host(String),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Keyframe tangent types understood by the core.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TangentType {
    #[default]
    Auto,
    Flat,
    Linear,
    Step,
    Spline,
}

/// Closed time interval in host time units.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// Capability interface over a live scene.
///
/// Object names may be given in long (`|a|b`) or short form; adapters resolve
/// them the way the host does and report ambiguity as
/// [`SceneError::AmbiguousName`].
pub trait SceneAdapter {
    // ----- objects -----

    /// All full paths whose short name (or full path) equals `name`.
    fn ls(&self, name: &str) -> Vec<String>;

    fn object_exists(&self, name: &str) -> bool;

    /// Every namespace present in the scene (nested ones as `a:b`).
    fn namespaces(&self) -> Vec<String>;

    fn selection(&self) -> Vec<String>;

    /// Replace the selection; an empty slice clears it.
    fn select(&mut self, objects: &[String]) -> SceneResult<()>;

    // ----- attributes -----

    /// Keyable, unlocked attributes of an object, in host order.
    fn list_attrs(&self, object: &str) -> SceneResult<Vec<String>>;

    fn attr_exists(&self, object: &str, attr: &str) -> bool;

    fn attr_type(&self, object: &str, attr: &str) -> SceneResult<String>;

    fn get_attr(&self, object: &str, attr: &str) -> SceneResult<Value>;

    /// Write a value. With `clamp` out-of-range numbers are clamped to the
    /// declared range, otherwise they are rejected.
    fn set_attr(&mut self, object: &str, attr: &str, value: &Value, clamp: bool)
        -> SceneResult<()>;

    /// Declared (min, max) of a numeric attribute.
    fn attr_range(&self, object: &str, attr: &str) -> SceneResult<(Option<f64>, Option<f64>)>;

    fn is_locked(&self, object: &str, attr: &str) -> SceneResult<bool>;

    fn is_keyable(&self, object: &str, attr: &str) -> SceneResult<bool>;

    /// Node type of the driver connected into this attribute, if any.
    fn source_connection(&self, object: &str, attr: &str) -> SceneResult<Option<String>>;

    // ----- keyframes -----

    fn set_keyframe(&mut self, object: &str, attr: &str, time: f64, value: &Value)
        -> SceneResult<()>;

    /// Sorted key times of the attribute's curve (empty when unkeyed).
    fn keyframe_times(&self, object: &str, attr: &str) -> SceneResult<Vec<f64>>;

    /// Move every key at or after `from` by `offset`.
    fn shift_keyframes(&mut self, object: &str, attr: &str, from: f64, offset: f64)
        -> SceneResult<()>;

    /// Delete every key inside `range`.
    fn cut_keyframes(&mut self, object: &str, attr: &str, range: TimeRange) -> SceneResult<()>;

    fn set_key_tangents(
        &mut self,
        object: &str,
        attr: &str,
        time: f64,
        in_tangent: Option<TangentType>,
        out_tangent: Option<TangentType>,
    ) -> SceneResult<()>;

    /// First key strictly after `time`.
    fn next_keyframe(&self, object: &str, attr: &str, time: f64) -> SceneResult<Option<f64>> {
        Ok(self
            .keyframe_times(object, attr)?
            .into_iter()
            .find(|t| *t > time))
    }

    // ----- host state -----

    fn open_undo_chunk(&mut self);

    fn close_undo_chunk(&mut self);

    fn auto_keyframe(&self) -> bool;

    fn set_auto_keyframe(&mut self, enabled: bool);

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, time: f64);
}

/// Host resources held while values are written back to the scene.
///
/// Acquiring opens an undo chunk, suspends auto-keyframing and remembers the
/// selection (optionally clearing it). Dropping the scope restores all of it,
/// on every exit path. Deref gives access to the wrapped adapter.
pub struct LoadScope<'a> {
    scene: &'a mut dyn SceneAdapter,
    auto_keyframe: bool,
    selection: Vec<String>,
}

impl<'a> LoadScope<'a> {
    pub fn acquire(scene: &'a mut dyn SceneAdapter, clear_selection: bool) -> Self {
        scene.open_undo_chunk();
        let selection = scene.selection();
        let auto_keyframe = scene.auto_keyframe();
        scene.set_auto_keyframe(false);
        if clear_selection {
            if let Err(err) = scene.select(&[]) {
                log::debug!("cannot clear selection before load: {err}");
            }
        }
        Self {
            scene,
            auto_keyframe,
            selection,
        }
    }
}

impl<'a> Deref for LoadScope<'a> {
    type Target = dyn SceneAdapter + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.scene
    }
}

impl<'a> DerefMut for LoadScope<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.scene
    }
}

impl Drop for LoadScope<'_> {
    fn drop(&mut self) {
        if !self.selection.is_empty() {
            if let Err(err) = self.scene.select(&self.selection) {
                log::debug!("cannot restore selection after load: {err}");
            }
        }
        self.scene.set_auto_keyframe(self.auto_keyframe);
        self.scene.close_undo_chunk();
    }
}
