//! AttributeHandle: one named attribute of one object, addressed through a
//! [`SceneAdapter`].
//!
//! The handle caches the attribute's type and value on first access. The
//! cache is only dropped by [`AttributeHandle::invalidate`], so repeated
//! blends all start from the same snapshot of the live value.

use serde::{Deserialize, Serialize};
use vizij_api_core::{add_values, blend_values, coercion, Value};

use crate::scene::{SceneAdapter, SceneResult, TangentType, TimeRange};

/// Per-write options for [`AttributeHandle::set`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptions {
    /// Percentage in `[0, 100]` of the way from the current value to the target.
    pub blend: f64,
    /// Also key the written value at the current time.
    pub key: bool,
    pub clamp: bool,
    /// Layer the target on top of the current value instead of replacing it.
    pub additive: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            blend: 100.0,
            key: false,
            clamp: true,
            additive: false,
        }
    }
}

/// How [`AttributeHandle::set_static_keyframe`] treats existing keys.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasteOption {
    /// Push later keys back to make room for the hold.
    #[default]
    Insert,
    /// Drop keys inside the range, keep everything else in place.
    Replace,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttributeHandle {
    object: String,
    attr: String,
    cache: Option<(String, Value)>,
}

impl AttributeHandle {
    pub fn new(object: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            attr: attr.into(),
            cache: None,
        }
    }

    /// A handle whose cache is pre-filled, e.g. from a recorded document.
    pub fn with_value(
        object: impl Into<String>,
        attr: impl Into<String>,
        type_name: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            object: object.into(),
            attr: attr.into(),
            cache: Some((type_name.into(), value)),
        }
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// `object.attr`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.object, self.attr)
    }

    fn fetch(&mut self, scene: &dyn SceneAdapter) -> SceneResult<&(String, Value)> {
        let entry = match self.cache.take() {
            Some(entry) => entry,
            None => (
                scene.attr_type(&self.object, &self.attr)?,
                scene.get_attr(&self.object, &self.attr)?,
            ),
        };
        Ok(self.cache.insert(entry))
    }

    pub fn value(&mut self, scene: &dyn SceneAdapter) -> SceneResult<Value> {
        Ok(self.fetch(scene)?.1.clone())
    }

    pub fn type_name(&mut self, scene: &dyn SceneAdapter) -> SceneResult<String> {
        Ok(self.fetch(scene)?.0.clone())
    }

    pub fn cached_value(&self) -> Option<&Value> {
        self.cache.as_ref().map(|(_, v)| v)
    }

    /// Forget the cached type and value; the next read goes to the scene.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn exists(&self, scene: &dyn SceneAdapter) -> bool {
        scene.attr_exists(&self.object, &self.attr)
    }

    /// Blend `value` into the attribute and return what was written.
    ///
    /// The baseline is the cached current value. `blend == 0` leaves the
    /// attribute untouched. Additive writes multiply scale channels and add
    /// everything else; only numeric values are layered.
    pub fn set(
        &mut self,
        scene: &mut dyn SceneAdapter,
        value: &Value,
        opts: &SetOptions,
    ) -> SceneResult<Value> {
        let current = self.value(scene)?;
        let t = opts.blend / 100.0;

        let result = if opts.additive && coercion::is_blendable(&current) {
            add_values(&current, value, t, self.attr.starts_with("scale"))
        } else if opts.blend == 0.0 {
            return Ok(current);
        } else {
            blend_values(&current, value, t)
        };

        scene.set_attr(&self.object, &self.attr, &result, opts.clamp)?;
        if opts.key {
            self.set_keyframe(scene, &result, None)?;
        }
        Ok(result)
    }

    /// Key `value` at `time` (default: the scene's current time), clamped to
    /// the attribute's declared range.
    pub fn set_keyframe(
        &mut self,
        scene: &mut dyn SceneAdapter,
        value: &Value,
        time: Option<f64>,
    ) -> SceneResult<()> {
        let (min, max) = scene.attr_range(&self.object, &self.attr)?;
        let value = match value.as_f64() {
            Some(mut number) => {
                if let Some(min) = min {
                    number = number.max(min);
                }
                if let Some(max) = max {
                    number = number.min(max);
                }
                match value {
                    Value::Int(_) => Value::Int(number.round() as i64),
                    _ => Value::Float(number),
                }
            }
            None => value.clone(),
        };
        let time = time.unwrap_or_else(|| scene.current_time());
        scene.set_keyframe(&self.object, &self.attr, time, &value)
    }

    /// Carve a hold of `value` over `range` without disturbing later animation.
    ///
    /// Keys at or after `range.start` move back by the range's duration, a
    /// stepped key is set at the start, a flat key at the end, and the next
    /// surviving key gets a flat in-tangent.
    pub fn insert_static_keyframe(
        &mut self,
        scene: &mut dyn SceneAdapter,
        value: &Value,
        range: TimeRange,
    ) -> SceneResult<()> {
        scene.shift_keyframes(&self.object, &self.attr, range.start, range.duration())?;
        self.key_hold(scene, value, range)
    }

    pub fn set_static_keyframe(
        &mut self,
        scene: &mut dyn SceneAdapter,
        value: &Value,
        range: TimeRange,
        option: PasteOption,
    ) -> SceneResult<()> {
        match option {
            PasteOption::Insert => self.insert_static_keyframe(scene, value, range),
            PasteOption::Replace => {
                scene.cut_keyframes(&self.object, &self.attr, range)?;
                self.key_hold(scene, value, range)
            }
        }
    }

    fn key_hold(
        &mut self,
        scene: &mut dyn SceneAdapter,
        value: &Value,
        range: TimeRange,
    ) -> SceneResult<()> {
        self.set_keyframe(scene, value, Some(range.start))?;
        self.set_keyframe(scene, value, Some(range.end))?;
        let (obj, attr) = (self.object.as_str(), self.attr.as_str());
        scene.set_key_tangents(obj, attr, range.start, None, Some(TangentType::Step))?;
        scene.set_key_tangents(
            obj,
            attr,
            range.end,
            Some(TangentType::Flat),
            Some(TangentType::Flat),
        )?;
        if let Some(next) = scene.next_keyframe(obj, attr, range.end)? {
            scene.set_key_tangents(obj, attr, next, Some(TangentType::Flat), None)?;
        }
        Ok(())
    }

    // ----- capability queries; scene errors read as "no" -----

    /// True when something drives this attribute, unless the driver's type
    /// starts with one of `ignore_types`.
    pub fn is_connected(&self, scene: &dyn SceneAdapter, ignore_types: &[String]) -> bool {
        match scene.source_connection(&self.object, &self.attr) {
            Ok(Some(driver)) => !ignore_types.iter().any(|t| driver.starts_with(t.as_str())),
            _ => false,
        }
    }

    pub fn is_locked(&self, scene: &dyn SceneAdapter) -> bool {
        scene.is_locked(&self.object, &self.attr).unwrap_or(false)
    }

    /// Numeric scalar attribute that is not locked.
    pub fn is_blendable(&mut self, scene: &dyn SceneAdapter, blendable_types: &[String]) -> bool {
        match self.type_name(scene) {
            Ok(t) => blendable_types.contains(&t) && !self.is_locked(scene),
            Err(_) => false,
        }
    }

    /// Unlocked, keyable, and either undriven or driven only by one of
    /// `valid_connection_types`.
    pub fn is_settable(&self, scene: &dyn SceneAdapter, valid_connection_types: &[String]) -> bool {
        if !self.exists(scene) || self.is_locked(scene) {
            return false;
        }
        if !scene.is_keyable(&self.object, &self.attr).unwrap_or(false) {
            return false;
        }
        match scene.source_connection(&self.object, &self.attr) {
            Ok(Some(driver)) => valid_connection_types
                .iter()
                .any(|t| driver.starts_with(t.as_str())),
            Ok(None) => true,
            Err(_) => false,
        }
    }
}
