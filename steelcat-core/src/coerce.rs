//! Lenient numeric coercion for loosely-typed input.
//!
//! Numeric record fields arrive from the transport as arbitrary JSON. They are
//! coerced here, once, at the write boundary:
//!
//! - JSON numbers pass through (floats are truncated toward zero for integer fields)
//! - strings are trimmed and parsed as numbers
//! - everything else (null, booleans, arrays, objects, unparseable strings,
//!   non-finite results) becomes `0`
//!
//! Unparseable input is never rejected; it falls back to the zero default.

use serde_json::Value;

/// Coerce a JSON value to a floating point field value.
pub fn coerce_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Coerce a JSON value to an integer field value.
pub fn coerce_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate_f64))
            .unwrap_or(0),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(truncate_f64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn truncate_f64(v: f64) -> Option<i64> {
    if v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

/// Coerce a JSON value to a string field value.
///
/// Strings pass through, numbers and booleans use their JSON text, and
/// anything else becomes the empty string.
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
