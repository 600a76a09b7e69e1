//! Lenient numeric coercion.
//!
//! Agreement data is often incomplete: thresholds typed as strings, blank
//! upper bounds, missing rates. Every helper here maps whatever it gets to a
//! finite `f64` (or `None` for an open bound) and never fails.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerces a loosely typed value to a finite number, defaulting to `0`.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };

    finite_or_zero(parsed.unwrap_or(0.0))
}

/// Coerces an upper bound. Blank, `null` and missing mean unbounded.
pub fn coerce_bound(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        other => Some(coerce_number(other)),
    }
}

/// True when [`coerce_number`] would read a real number rather than fall
/// back to `0`.
pub fn is_numeric_like(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().is_some_and(f64::is_finite),
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `deserialize_with` adapter for fields that must always end up numeric.
pub fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(coerce_number(value.as_ref()))
}
