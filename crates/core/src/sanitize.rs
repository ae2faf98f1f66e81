//! HTML escaping and identifier generation.
//!
//! Every piece of backend- or user-provided text that ends up in markup goes
//! through one of the two escape functions below.

use serde_json::Value;
use uuid::Uuid;

/// Prefix of generated conversation/session identifiers.
pub const GENERATED_ID_PREFIX: &str = "sess_";

/// Escape text for insertion as HTML element content.
pub fn escape_for_text(value: impl AsRef<str>) -> String {
    let value = value.as_ref();
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape text for insertion inside a quoted HTML attribute value.
///
/// Stricter than [`escape_for_text`]: both quote characters are encoded so
/// the value can never terminate the attribute.
pub fn escape_for_attribute(value: impl AsRef<str>) -> String {
    let value = value.as_ref();
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Generate a random session identifier (`sess_<uuid>`).
pub fn generate_id() -> String {
    format!("{GENERATED_ID_PREFIX}{}", Uuid::new_v4())
}

/// Escape every string leaf of a JSON value for text insertion.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_for_text(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
