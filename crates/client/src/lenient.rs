//! Forgiving deserializers for backend payloads.
//!
//! The workflow backend is loosely typed: counters arrive as numbers or as
//! numeric strings, timestamps may be missing or malformed. None of these
//! helpers ever fail; they fall back to a neutral value instead.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Integer from a number or a string with a leading integer (`"12.5"` → 12).
pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(to_int(&Value::deserialize(deserializer)?))
}

/// Float from a number or a string with a leading decimal (`"3.5kb"` → 3.5).
pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(to_float(&Value::deserialize(deserializer)?))
}

/// `true` only when the payload says exactly `true`.
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// `false` only when the payload says exactly `false`.
pub fn flag_default_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(!matches!(Value::deserialize(deserializer)?, Value::Bool(false)))
}

pub fn default_true() -> bool {
    true
}

/// RFC 3339 timestamp, `None` when absent or unparseable.
pub fn opt_datetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// Missing or `null` string becomes empty.
pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Optional identifier; blank, `null` or non-string values become `None`.
pub fn opt_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    Ok(Value::deserialize(deserializer)?
        .as_str()
        .and_then(|raw| raw.parse().ok()))
}

/// Entries of a list sent either bare or wrapped as `{ "<key>": [...] }`.
///
/// Entries are decoded one at a time; a malformed entry is logged and
/// skipped instead of failing the whole list.
pub fn list<T: DeserializeOwned>(value: Value, key: &str) -> Vec<T> {
    let entries = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<T>(entry) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::warn!(list = key, error = %err, "skipping malformed entry");
                None
            }
        })
        .collect()
}

pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)).unwrap_or(0),
        Value::String(s) => leading_number(s, false).and_then(|n| n.parse().ok()).unwrap_or(0),
        _ => 0,
    }
}

pub fn to_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s, true).and_then(|n| n.parse().ok()).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn leading_number(raw: &str, allow_fraction: bool) -> Option<&str> {
    let trimmed = raw.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '-' | '+' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if allow_fraction && !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }
    seen_digit.then(|| trimmed[..end].trim_end_matches('.'))
}
