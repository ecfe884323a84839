//! Value: attribute values as recorded in pose documents and exchanged with a
//! scene adapter. Numbers use f64 to match host attribute precision.

use serde::{Deserialize, Serialize};

/// Untagged so documents store plain JSON scalars and arrays:
/// `true`, `3`, `0.25`, `"text"`, `[1.0, 0.0, 0.0]`.
///
/// Variant order matters for deserialization: integers are tried before
/// floats so `3` stays an `Int` while `3.0` becomes a `Float`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// Boolean (step)
    Bool(bool),

    /// Integer attributes (long, short, enum indices)
    Int(i64),

    /// Scalar float (double, doubleLinear, doubleAngle, ...)
    Float(f64),

    /// Text; step-only for blending
    Text(String),

    /// Compound attributes (double3, matrix, ...)
    List(Vec<Value>),
}

impl Value {
    pub fn vec3(x: f64, y: f64, z: f64) -> Self {
        Value::List(vec![Value::Float(x), Value::Float(y), Value::Float(z)])
    }

    /// True for Int and Float.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric view of scalar values; `None` for bool, text and lists.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Multiply every numeric component by `factor`. Non-numeric values are
    /// returned unchanged.
    pub fn scaled(&self, factor: f64) -> Value {
        match self {
            Value::Int(i) if factor.fract() == 0.0 => Value::Int(i * factor as i64),
            Value::Int(i) => Value::Float(*i as f64 * factor),
            Value::Float(f) => Value::Float(f * factor),
            Value::List(items) => Value::List(items.iter().map(|v| v.scaled(factor)).collect()),
            other => other.clone(),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
