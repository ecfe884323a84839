//! Blending utilities for attribute Values.
//! - f64 linear interpolation for floats and list components
//! - integers interpolate then round to the nearest integer
//! - elementwise blending for lists
//! - step blending for Bool/Text (choose left or right by t < 0.5)
//! - additive layering of a recorded value on top of the current one
//!
//! `t` is normalized: 0.0 keeps `a`, 1.0 yields exactly `b`.

use crate::coercion;
use crate::Value;

/// Linear interpolation for f64
#[inline]
fn lerp_f(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Blend two Values according to their kinds.
/// For mismatched kinds we attempt reasonable coercions:
/// - Int <-> Float: blend as floats
/// - scalar <-> List: broadcast the scalar across the list
///   Step types (Bool/Text) are chosen based on t < 0.5 -> a else b.
pub fn blend_values(a: &Value, b: &Value, t: f64) -> Value {
    if t <= 0.0 {
        return a.clone();
    }
    if t >= 1.0 {
        return b.clone();
    }
    match (a, b) {
        (Value::Float(af), Value::Float(bf)) => Value::Float(lerp_f(*af, *bf, t)),

        (Value::Int(ai), Value::Int(bi)) => {
            Value::Int(lerp_f(*ai as f64, *bi as f64, t).round() as i64)
        }

        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => Value::Float(
            lerp_f(coercion::to_float(a), coercion::to_float(b), t),
        ),

        (Value::List(a_items), Value::List(b_items)) => {
            Value::List(blend_list_like(a_items, b_items, t))
        }

        (scalar, Value::List(b_items)) if scalar.is_numeric() => {
            let a_items = vec![scalar.clone(); b_items.len()];
            Value::List(blend_list_like(&a_items, b_items, t))
        }
        (Value::List(a_items), scalar) if scalar.is_numeric() => {
            let b_items = vec![scalar.clone(); a_items.len()];
            Value::List(blend_list_like(a_items, &b_items, t))
        }

        _ => step_blend(a, b, t),
    }
}

fn blend_list_like(a: &[Value], b: &[Value], t: f64) -> Vec<Value> {
    let len = a.len().max(b.len());
    let mut out = Vec::with_capacity(len);
    for idx in 0..len {
        match (a.get(idx), b.get(idx)) {
            (Some(va), Some(vb)) => out.push(blend_values(va, vb, t)),
            (Some(va), None) => {
                if t < 0.5 {
                    out.push(va.clone());
                }
            }
            (None, Some(vb)) => {
                if t >= 0.5 {
                    out.push(vb.clone());
                }
            }
            (None, None) => {}
        }
    }
    out
}

/// Step blending for step-only types: choose a for t < 0.5, else b.
pub fn step_blend(a: &Value, b: &Value, t: f64) -> Value {
    if t < 0.5 {
        a.clone()
    } else {
        b.clone()
    }
}

/// Layer `delta` on top of `current`, weighted by `t`.
///
/// With `multiplicative` (scale channels) the identity is 1.0 and the result
/// is `current * (1 + (delta - 1) * t)`; otherwise `current + delta * t`.
/// Values that cannot be added (bool, text) return `current` unchanged.
pub fn add_values(current: &Value, delta: &Value, t: f64, multiplicative: bool) -> Value {
    let combine = |c: f64, d: f64| {
        if multiplicative {
            c * (1.0 + (d - 1.0) * t)
        } else {
            c + d * t
        }
    };
    match (current, delta) {
        (Value::Float(c), d) if d.is_numeric() => Value::Float(combine(*c, coercion::to_float(d))),
        (Value::Int(c), Value::Int(d)) => Value::Int(combine(*c as f64, *d as f64).round() as i64),
        (Value::Int(c), Value::Float(d)) => Value::Float(combine(*c as f64, *d)),
        (Value::List(cs), Value::List(ds)) => Value::List(
            cs.iter()
                .enumerate()
                .map(|(idx, c)| match ds.get(idx) {
                    Some(d) => add_values(c, d, t, multiplicative),
                    None => c.clone(),
                })
                .collect(),
        ),
        _ => current.clone(),
    }
}
