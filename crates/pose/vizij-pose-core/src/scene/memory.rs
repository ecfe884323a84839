//! In-memory scene used by tests and tooling.
//!
//! Objects are stored under the path they were added with. Lookups accept the
//! stored path, the same path with or without a leading '|', or any unique
//! trailing run of '|'-separated segments (the host's short-name rules).

use indexmap::map::Entry;
use indexmap::IndexMap;
use vizij_api_core::{NodeReference, Value};

use super::{SceneAdapter, SceneError, SceneResult, TangentType, TimeRange};

const TIME_EPSILON: f64 = 1e-6;

/// Driver node types that still accept direct writes (the host overwrites
/// the curve value until the next evaluation).
const WRITABLE_DRIVERS: [&str; 1] = ["animCurve"];

/// Integer-valued attribute types; float writes are rounded.
const INTEGER_TYPES: [&str; 5] = ["long", "short", "int", "byte", "enum"];

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryKey {
    pub time: f64,
    pub value: Value,
    pub in_tangent: TangentType,
    pub out_tangent: TangentType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryAttribute {
    pub type_name: String,
    pub value: Value,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub locked: bool,
    pub keyable: bool,
    /// Node type of the incoming connection, e.g. "animCurveTL" or "pairBlend".
    pub connection: Option<String>,
    pub keys: Vec<MemoryKey>,
}

impl MemoryAttribute {
    pub fn new(type_name: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
            min: None,
            max: None,
            locked: false,
            keyable: true,
            connection: None,
            keys: Vec::new(),
        }
    }

    fn key_index(&self, time: f64) -> Option<usize> {
        self.keys
            .iter()
            .position(|k| (k.time - time).abs() <= TIME_EPSILON)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryScene {
    objects: IndexMap<String, IndexMap<String, MemoryAttribute>>,
    extra_namespaces: Vec<String>,
    selection: Vec<String>,
    auto_keyframe: bool,
    current_time: f64,
    open_undo_chunks: usize,
    closed_undo_chunks: usize,
    attr_writes: usize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an (empty) object; re-adding an existing path keeps its attributes.
    pub fn add_object(&mut self, path: &str) -> &mut Self {
        self.objects.entry(path.to_string()).or_default();
        self
    }

    /// Add or replace an attribute, creating the object when needed.
    pub fn add_attr(
        &mut self,
        object: &str,
        attr: &str,
        type_name: &str,
        value: impl Into<Value>,
    ) -> &mut MemoryAttribute {
        let fresh = MemoryAttribute::new(type_name, value.into());
        match self
            .objects
            .entry(object.to_string())
            .or_default()
            .entry(attr.to_string())
        {
            Entry::Occupied(mut slot) => {
                slot.insert(fresh);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(fresh),
        }
    }

    /// Convenience: add the nine transform channels with identity values.
    pub fn add_transform(&mut self, object: &str) -> &mut Self {
        for axis in ["X", "Y", "Z"] {
            self.add_attr(object, &format!("translate{axis}"), "doubleLinear", 0.0);
            self.add_attr(object, &format!("rotate{axis}"), "doubleAngle", 0.0);
            self.add_attr(object, &format!("scale{axis}"), "double", 1.0);
        }
        self
    }

    /// Register a namespace that has no objects yet.
    pub fn add_namespace(&mut self, namespace: &str) -> &mut Self {
        self.extra_namespaces.push(namespace.to_string());
        self
    }

    pub fn attribute(&self, object: &str, attr: &str) -> Option<&MemoryAttribute> {
        let key = self.resolve(object).ok()?;
        self.objects.get(&key)?.get(attr)
    }

    pub fn attribute_mut(&mut self, object: &str, attr: &str) -> Option<&mut MemoryAttribute> {
        let key = self.resolve(object).ok()?;
        self.objects.get_mut(&key)?.get_mut(attr)
    }

    /// Current value of an attribute, for assertions.
    pub fn value(&self, object: &str, attr: &str) -> Option<&Value> {
        self.attribute(object, attr).map(|a| &a.value)
    }

    pub fn open_undo_chunks(&self) -> usize {
        self.open_undo_chunks
    }

    pub fn closed_undo_chunks(&self) -> usize {
        self.closed_undo_chunks
    }

    /// Number of successful attribute writes since creation.
    pub fn attr_writes(&self) -> usize {
        self.attr_writes
    }

    fn resolve(&self, name: &str) -> SceneResult<String> {
        if self.objects.contains_key(name) {
            return Ok(name.to_string());
        }
        let matches = self.ls(name);
        match matches.len() {
            0 => Err(SceneError::ObjectNotFound(name.to_string())),
            1 => Ok(matches[0].clone()),
            _ => Err(SceneError::AmbiguousName(name.to_string())),
        }
    }

    fn attr_ref(&self, object: &str, attr: &str) -> SceneResult<&MemoryAttribute> {
        let key = self.resolve(object)?;
        self.objects[&key]
            .get(attr)
            .ok_or_else(|| SceneError::AttributeNotFound(format!("{object}.{attr}")))
    }

    fn attr_mut(&mut self, object: &str, attr: &str) -> SceneResult<&mut MemoryAttribute> {
        let key = self.resolve(object)?;
        self.objects
            .get_mut(&key)
            .and_then(|attrs| attrs.get_mut(attr))
            .ok_or_else(|| SceneError::AttributeNotFound(format!("{object}.{attr}")))
    }
}

fn conform(
    attr: &MemoryAttribute,
    full_name: &str,
    value: &Value,
    clamp: bool,
) -> SceneResult<Value> {
    let invalid = |reason: &str| SceneError::InvalidValue {
        attr: full_name.to_string(),
        reason: reason.to_string(),
    };
    match (&attr.value, value) {
        (Value::Text(_), Value::Text(_)) => Ok(value.clone()),
        (Value::Bool(_), Value::Bool(_)) => Ok(value.clone()),
        (Value::Bool(_), v) if v.is_numeric() => Ok(Value::Bool(v.as_f64() != Some(0.0))),
        (Value::List(current), Value::List(items)) => {
            if current.len() != items.len() {
                return Err(invalid("compound length mismatch"));
            }
            Ok(value.clone())
        }
        (Value::Int(_) | Value::Float(_), v) if v.is_numeric() => {
            let mut number = v.as_f64().unwrap_or_default();
            let below = attr.min.is_some_and(|min| number < min);
            let above = attr.max.is_some_and(|max| number > max);
            if below || above {
                if !clamp {
                    return Err(invalid("value outside declared range"));
                }
                if let Some(min) = attr.min {
                    number = number.max(min);
                }
                if let Some(max) = attr.max {
                    number = number.min(max);
                }
            }
            if INTEGER_TYPES.contains(&attr.type_name.as_str()) {
                Ok(Value::Int(number.round() as i64))
            } else {
                Ok(Value::Float(number))
            }
        }
        _ => Err(invalid("incompatible value kind")),
    }
}

impl SceneAdapter for MemoryScene {
    fn ls(&self, name: &str) -> Vec<String> {
        let wanted = name.trim_start_matches('|');
        if wanted.is_empty() {
            return Vec::new();
        }
        self.objects
            .keys()
            .filter(|path| {
                let path = path.trim_start_matches('|');
                path == wanted || path.ends_with(&format!("|{wanted}"))
            })
            .cloned()
            .collect()
    }

    fn object_exists(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    fn namespaces(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |ns: String| {
            if !ns.is_empty() && !out.contains(&ns) {
                out.push(ns);
            }
        };
        for path in self.objects.keys() {
            for segment in path.split('|') {
                let ns = NodeReference::new(segment).namespace().to_string();
                let mut prefix = String::new();
                for part in ns.split(':').filter(|p| !p.is_empty()) {
                    if !prefix.is_empty() {
                        prefix.push(':');
                    }
                    prefix.push_str(part);
                    push(prefix.clone());
                }
            }
        }
        for ns in &self.extra_namespaces {
            push(ns.clone());
        }
        out
    }

    fn selection(&self) -> Vec<String> {
        self.selection.clone()
    }

    fn select(&mut self, objects: &[String]) -> SceneResult<()> {
        let mut resolved = Vec::with_capacity(objects.len());
        for name in objects {
            resolved.push(self.resolve(name)?);
        }
        self.selection = resolved;
        Ok(())
    }

    fn list_attrs(&self, object: &str) -> SceneResult<Vec<String>> {
        let key = self.resolve(object)?;
        Ok(self.objects[&key]
            .iter()
            .filter(|(_, a)| a.keyable && !a.locked)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn attr_exists(&self, object: &str, attr: &str) -> bool {
        self.attr_ref(object, attr).is_ok()
    }

    fn attr_type(&self, object: &str, attr: &str) -> SceneResult<String> {
        Ok(self.attr_ref(object, attr)?.type_name.clone())
    }

    fn get_attr(&self, object: &str, attr: &str) -> SceneResult<Value> {
        Ok(self.attr_ref(object, attr)?.value.clone())
    }

    fn set_attr(
        &mut self,
        object: &str,
        attr: &str,
        value: &Value,
        clamp: bool,
    ) -> SceneResult<()> {
        let full_name = format!("{object}.{attr}");
        let slot = self.attr_mut(object, attr)?;
        if slot.locked {
            return Err(SceneError::Locked(full_name));
        }
        if let Some(driver) = &slot.connection {
            if !WRITABLE_DRIVERS.iter().any(|d| driver.starts_with(d)) {
                return Err(SceneError::Connected(full_name));
            }
        }
        slot.value = conform(slot, &full_name, value, clamp)?;
        self.attr_writes += 1;
        Ok(())
    }

    fn attr_range(&self, object: &str, attr: &str) -> SceneResult<(Option<f64>, Option<f64>)> {
        let a = self.attr_ref(object, attr)?;
        Ok((a.min, a.max))
    }

    fn is_locked(&self, object: &str, attr: &str) -> SceneResult<bool> {
        Ok(self.attr_ref(object, attr)?.locked)
    }

    fn is_keyable(&self, object: &str, attr: &str) -> SceneResult<bool> {
        Ok(self.attr_ref(object, attr)?.keyable)
    }

    fn source_connection(&self, object: &str, attr: &str) -> SceneResult<Option<String>> {
        Ok(self.attr_ref(object, attr)?.connection.clone())
    }

    fn set_keyframe(
        &mut self,
        object: &str,
        attr: &str,
        time: f64,
        value: &Value,
    ) -> SceneResult<()> {
        let full_name = format!("{object}.{attr}");
        let slot = self.attr_mut(object, attr)?;
        if slot.locked {
            return Err(SceneError::Locked(full_name));
        }
        let value = conform(slot, &full_name, value, true)?;
        match slot.key_index(time) {
            Some(idx) => slot.keys[idx].value = value,
            None => {
                slot.keys.push(MemoryKey {
                    time,
                    value,
                    in_tangent: TangentType::Auto,
                    out_tangent: TangentType::Auto,
                });
                slot.keys.sort_by(|a, b| a.time.total_cmp(&b.time));
            }
        }
        if slot.connection.is_none() {
            slot.connection = Some("animCurve".to_string());
        }
        Ok(())
    }

    fn keyframe_times(&self, object: &str, attr: &str) -> SceneResult<Vec<f64>> {
        Ok(self
            .attr_ref(object, attr)?
            .keys
            .iter()
            .map(|k| k.time)
            .collect())
    }

    fn shift_keyframes(
        &mut self,
        object: &str,
        attr: &str,
        from: f64,
        offset: f64,
    ) -> SceneResult<()> {
        let slot = self.attr_mut(object, attr)?;
        for key in slot.keys.iter_mut().filter(|k| k.time >= from - TIME_EPSILON) {
            key.time += offset;
        }
        slot.keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(())
    }

    fn cut_keyframes(&mut self, object: &str, attr: &str, range: TimeRange) -> SceneResult<()> {
        let slot = self.attr_mut(object, attr)?;
        slot.keys.retain(|k| !range.contains(k.time));
        Ok(())
    }

    fn set_key_tangents(
        &mut self,
        object: &str,
        attr: &str,
        time: f64,
        in_tangent: Option<TangentType>,
        out_tangent: Option<TangentType>,
    ) -> SceneResult<()> {
        let full_name = format!("{object}.{attr}");
        let slot = self.attr_mut(object, attr)?;
        let idx = slot.key_index(time).ok_or(SceneError::NoKeyframe {
            attr: full_name,
            time,
        })?;
        if let Some(t) = in_tangent {
            slot.keys[idx].in_tangent = t;
        }
        if let Some(t) = out_tangent {
            slot.keys[idx].out_tangent = t;
        }
        Ok(())
    }

    fn open_undo_chunk(&mut self) {
        self.open_undo_chunks += 1;
    }

    fn close_undo_chunk(&mut self) {
        if self.open_undo_chunks > 0 {
            self.open_undo_chunks -= 1;
            self.closed_undo_chunks += 1;
        }
    }

    fn auto_keyframe(&self) -> bool {
        self.auto_keyframe
    }

    fn set_auto_keyframe(&mut self, enabled: bool) {
        self.auto_keyframe = enabled;
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, time: f64) {
        self.current_time = time;
    }
}
