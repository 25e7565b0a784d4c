//! Lenient field decoding and JSON-pointer checks shared by the variant tables.

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;

use super::NormError;
use crate::Observed;

/// Text placeholders providers publish instead of a missing reading.
const TEXT_SENTINELS: [&str; 5] = ["", "X", "-99", "-99.0", "-990"];

/// Numeric placeholders providers publish instead of a missing reading.
const NUMERIC_SENTINELS: [f64; 3] = [-99.0, -990.0, -999.0];

pub(crate) fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => false,
    }
}

pub(crate) fn non_empty_array_at(raw: &Value, pointer: &str) -> bool {
    raw.pointer(pointer)
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty())
}

pub(crate) fn empty_array_at(raw: &Value, pointer: &str) -> bool {
    raw.pointer(pointer)
        .and_then(Value::as_array)
        .is_some_and(Vec::is_empty)
}

pub(crate) fn object_at(raw: &Value, pointer: &str) -> bool {
    raw.pointer(pointer).is_some_and(Value::is_object)
}

/// A list (possibly empty) or a single object sits at `pointer`.
pub(crate) fn records_at(raw: &Value, pointer: &str) -> bool {
    raw.pointer(pointer)
        .is_some_and(|value| value.is_array() || value.is_object())
}

pub(crate) fn decode<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T, NormError> {
    T::deserialize(value).map_err(|error| NormError::incomplete(format!("{what}: {error}")))
}

/// Decodes every entry of the list at `pointer`, or the lone object found there.
pub(crate) fn list_at<T: DeserializeOwned>(
    raw: &Value,
    pointer: &str,
    what: &str,
) -> Result<Vec<T>, NormError> {
    match raw.pointer(pointer) {
        Some(Value::Array(items)) => items.iter().map(|item| decode(item, what)).collect(),
        Some(item @ Value::Object(_)) => Ok(vec![decode(item, what)?]),
        _ => Err(NormError::incomplete(format!(
            "{what}: expected a list or object at {pointer}"
        ))),
    }
}

/// Decodes only the first entry of the list at `pointer`, or the lone object found there.
///
/// Providers list reports newest first; older entries are never inspected.
pub(crate) fn newest_at<T: DeserializeOwned>(
    raw: &Value,
    pointer: &str,
    what: &str,
) -> Result<Vec<T>, NormError> {
    match raw.pointer(pointer) {
        Some(Value::Array(items)) => items
            .first()
            .map(|item| decode(item, what))
            .into_iter()
            .collect(),
        Some(item @ Value::Object(_)) => Ok(vec![decode(item, what)?]),
        _ => Err(NormError::incomplete(format!(
            "{what}: expected a list or object at {pointer}"
        ))),
    }
}

pub(crate) fn known_number(value: Option<f64>) -> Observed<f64> {
    Observed::from_option(value.filter(|number| !NUMERIC_SENTINELS.contains(number)))
}

pub(crate) fn known_text(value: Option<String>) -> Observed<String> {
    Observed::from_option(value.filter(|text| !TEXT_SENTINELS.contains(&text.as_str())))
}

pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}

pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_owned()).filter(|text| !text.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Number or numeric string; anything else reads as absent.
pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?))
}

pub(crate) fn opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Trimmed text or a number rendered as text; blank and null read as absent.
pub(crate) fn opt_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(text(&Value::deserialize(deserializer)?))
}

/// Required text: a non-blank string or a number.
pub(crate) fn required_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    text(&value).ok_or_else(|| D::Error::custom(format!("expected non-empty text, found {value}")))
}
