//! Coercion helpers between Value kinds, used when blending values whose
//! kinds do not line up exactly (e.g. an Int recorded against a Float plug).

use crate::Value;

/// Attempt to coerce a Value into a scalar f64.
/// Rules:
/// - Int/Float -> its value
/// - Bool -> 1.0 / 0.0
/// - List -> first element or 0.0 if empty
/// - Text -> 0.0
pub fn to_float(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::List(items) => items.first().map(to_float).unwrap_or(0.0),
        Value::Text(_) => 0.0,
    }
}

/// True when the value can take part in linear blending: numbers, or lists
/// made only of numbers.
pub fn is_blendable(v: &Value) -> bool {
    match v {
        Value::Int(_) | Value::Float(_) => true,
        Value::List(items) => items.iter().all(is_blendable),
        Value::Bool(_) | Value::Text(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_coercion() {
        assert_eq!(to_float(&Value::Bool(true)), 1.0);
        assert_eq!(to_float(&Value::Int(4)), 4.0);
        assert_eq!(to_float(&Value::vec3(2.0, 3.0, 4.0)), 2.0);
        assert_eq!(to_float(&Value::Text("x".into())), 0.0);
    }

    #[test]
    fn blendable_values_are_numeric_throughout() {
        let v = Value::List(vec![Value::vec3(1.0, 2.0, 3.0), Value::Int(4)]);
        assert!(is_blendable(&v));
        assert!(!is_blendable(&Value::List(vec![Value::Bool(false)])));
    }
}
