//! Helpers for reading loosely typed property values.

use serde_json::Value;

/// JavaScript-style truthiness of a stored property.
///
/// Absent, `null`, `false`, `0` and `""` are falsy; everything else is
/// truthy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Read a property as a list of strings.
///
/// Returns `None` unless the value is an array whose items are all strings.
pub fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Read a property as a string.
pub fn string_value(value: Option<&Value>) -> Option<String> {
    value?.as_str().map(str::to_string)
}
