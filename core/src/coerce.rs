//! Raw token → typed value conversion.
//!
//! [`coerce`] dispatches on the [`FlagType`] tag. Primitive conversions are
//! synchronous; custom conversions may suspend, so the entry point is async
//! and [`coerce_blocking`] exists for callers that cannot await.

use futures::executor;
use thiserror::Error;

use crate::{FlagType, FlagValues, ParseError, PrimitiveType, ProcessedFlag, Value};

/// A token could not be converted to the flag's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CoerceError {
    pub message: String,
}

impl CoerceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Converts `raw` according to `flag_type`.
///
/// # Examples
///
/// ```
/// use flagtree_core::{PrimitiveType, Value, coerce_blocking};
///
/// let n = coerce_blocking("42", &PrimitiveType::Number.into()).unwrap();
/// assert_eq!(n, Value::from(42));
///
/// assert!(coerce_blocking("forty-two", &PrimitiveType::Number.into()).is_err());
/// ```
pub async fn coerce(raw: &str, flag_type: &FlagType) -> Result<Value, CoerceError> {
    match flag_type {
        FlagType::Primitive(primitive) => coerce_primitive(raw, *primitive),
        FlagType::Custom(coercer) => coercer.call(raw.to_string()).await.map_err(CoerceError::new),
        FlagType::Schema(schema) => {
            let parsed =
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            schema.check(&parsed).map_err(CoerceError::new)
        }
    }
}

/// Synchronous fallback for [`coerce`].
pub fn coerce_blocking(raw: &str, flag_type: &FlagType) -> Result<Value, CoerceError> {
    executor::block_on(coerce(raw, flag_type))
}

pub fn coerce_primitive(raw: &str, primitive: PrimitiveType) -> Result<Value, CoerceError> {
    match primitive {
        PrimitiveType::String => Ok(Value::String(raw.to_string())),
        PrimitiveType::Boolean => Ok(Value::Bool(parse_bool(raw))),
        PrimitiveType::Number => parse_number(raw)
            .ok_or_else(|| CoerceError::new(format!("expected a number, got '{raw}'"))),
        PrimitiveType::Array => {
            if raw.trim_start().starts_with('[') {
                serde_json::from_str::<Vec<Value>>(raw)
                    .map(Value::Array)
                    .map_err(|e| CoerceError::new(format!("invalid JSON array: {e}")))
            } else if raw.is_empty() {
                Ok(Value::Array(Vec::new()))
            } else {
                Ok(Value::Array(
                    raw.split(',').map(|s| Value::String(s.to_string())).collect(),
                ))
            }
        }
        PrimitiveType::Object => serde_json::from_str::<FlagValues>(raw)
            .map(Value::Object)
            .map_err(|e| CoerceError::new(format!("expected a JSON object: {e}"))),
    }
}

/// `true`, `yes` and `1` (any case) are true; everything else is false.
pub fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

/// Strict numeric parse: integers first, then finite floats.
pub fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::from(int));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// Checks a coerced value against the flag's allowed set.
///
/// Arrays of `allow_multiple` flags are checked element by element.
pub fn check_enum(flag: &ProcessedFlag, value: &Value) -> Result<(), ParseError> {
    if flag.enum_values.is_empty() {
        return Ok(());
    }

    let candidates: Vec<&Value> = match value {
        Value::Array(items) if flag.allow_multiple => items.iter().collect(),
        other => vec![other],
    };

    match candidates
        .into_iter()
        .find(|v| !flag.enum_values.contains(v))
    {
        Some(bad) => Err(ParseError::InvalidEnumValue {
            flag: flag.name.clone(),
            value: display_value(bad),
            allowed: flag.enum_values.iter().map(display_value).collect(),
        }),
        None => Ok(()),
    }
}

/// Renders a value for messages: strings without quotes, everything else as
/// JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
