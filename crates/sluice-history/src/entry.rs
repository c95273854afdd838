//! History entry type and validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sluice_core::constants::{MAX_BODY_LEN, MAX_HEADERS_LEN, MAX_METHOD_LEN, MAX_URL_LEN};
use sluice_store::props::is_truthy;

/// One composed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub date: i64,
    /// Request URL.
    pub url: String,
    /// Request method.
    pub method: String,
    /// Raw request headers.
    pub headers: String,
    /// Request body.
    pub body: String,
    /// Body is hex-encoded.
    #[serde(default)]
    pub is_hex_text: bool,
}

impl HistoryEntry {
    /// Build an entry from a client payload.
    ///
    /// Returns `None` unless `needResponse` is truthy and `url`, `method`,
    /// `headers` and `body` are all strings. Fields are truncated to their
    /// byte limits.
    pub fn from_request(data: &Value, date: i64) -> Option<Self> {
        if !is_truthy(data.get("needResponse")) {
            return None;
        }
        let field = |key: &str| data.get(key).and_then(Value::as_str);
        Some(Self {
            date,
            url: truncate(field("url")?, MAX_URL_LEN),
            method: truncate(field("method")?, MAX_METHOD_LEN),
            headers: truncate(field("headers")?, MAX_HEADERS_LEN),
            body: truncate(field("body")?, MAX_BODY_LEN),
            is_hex_text: is_truthy(data.get("isHexText")),
        })
    }

    /// Parse a persisted entry, rejecting structurally invalid ones.
    pub fn from_stored(value: &Value) -> Option<Self> {
        let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            date: value.get("date").and_then(Value::as_i64).unwrap_or_default(),
            url: field("url")?,
            method: field("method")?,
            headers: field("headers")?,
            body: field("body")?,
            is_hex_text: value
                .get("isHexText")
                .and_then(Value::as_bool)
                .unwrap_or_default(),
        })
    }

    /// Whether both entries describe the same request.
    pub fn same_request(&self, other: &Self) -> bool {
        self.url == other.url
            && self.method == other.method
            && self.headers == other.headers
            && self.body == other.body
    }
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> Value {
        json!({
            "needResponse": true,
            "url": "https://a.test/",
            "method": "GET",
            "headers": "Accept: */*",
            "body": "",
        })
    }

    #[test]
    fn accepts_valid_request() {
        let entry = HistoryEntry::from_request(&request(), 42).unwrap();
        assert_eq!(entry.date, 42);
        assert_eq!(entry.method, "GET");
        assert!(!entry.is_hex_text);
    }

    #[test]
    fn requires_need_response() {
        let mut data = request();
        data["needResponse"] = json!(false);
        assert!(HistoryEntry::from_request(&data, 0).is_none());
        let _ = data.as_object_mut().unwrap().remove("needResponse");
        assert!(HistoryEntry::from_request(&data, 0).is_none());
    }

    #[test]
    fn requires_string_fields() {
        let mut data = request();
        data["body"] = json!(1);
        assert!(HistoryEntry::from_request(&data, 0).is_none());
    }

    #[test]
    fn truncates_each_field() {
        let mut data = request();
        data["url"] = json!("u".repeat(MAX_URL_LEN + 10));
        data["method"] = json!("M".repeat(100));
        let entry = HistoryEntry::from_request(&data, 0).unwrap();
        assert_eq!(entry.url.len(), MAX_URL_LEN);
        assert_eq!(entry.method.len(), MAX_METHOD_LEN);
        assert_eq!(entry.headers, "Accept: */*");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate("aé", 2), "a");
        assert_eq!(truncate("abc", 5), "abc");
    }

    #[test]
    fn stored_entry_validation() {
        assert!(HistoryEntry::from_stored(&json!({"url": "u", "method": "GET"})).is_none());
        let entry = HistoryEntry::from_stored(&json!({
            "date": 5, "url": "u", "method": "GET", "headers": "", "body": "", "isHexText": true
        }))
        .unwrap();
        assert_eq!(entry.date, 5);
        assert!(entry.is_hex_text);
    }
}
