//! Body codec — content-type-aware payload decoding.
//!
//! Decoding is best effort and never fails: anything that cannot be
//! parsed degrades to the raw string so one malformed body cannot
//! abort a capture session.

use serde_json::Value;

/// Decode a raw payload using the declared content type.
///
/// Absent or empty payloads decode to `None`. JSON bodies are parsed
/// strictly and fall back to the raw string on parse failure. Form
/// bodies become a flat string map, last occurrence winning. Anything
/// else is returned as the raw string (binary payloads may carry
/// replacement characters; accepted limitation of this layer).
pub fn decode_body(raw: Option<&str>, content_type: &str) -> Option<Value> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    if content_type.contains("application/json") {
        return Some(
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        );
    }

    if content_type.contains("application/x-www-form-urlencoded") {
        let mut map = serde_json::Map::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            map.insert(key.into_owned(), Value::String(value.into_owned()));
        }
        return Some(Value::Object(map));
    }

    Some(Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_and_empty_bodies() {
        assert_eq!(decode_body(None, "application/json"), None);
        assert_eq!(decode_body(Some(""), "application/json"), None);
    }

    #[test]
    fn test_json_body() {
        let decoded = decode_body(Some(r#"{"id": 7, "name": "ada"}"#), "application/json; charset=utf-8");
        assert_eq!(decoded, Some(json!({"id": 7, "name": "ada"})));
    }

    #[test]
    fn test_malformed_json_degrades_to_raw_string() {
        let decoded = decode_body(Some("{bad json"), "application/json");
        assert_eq!(decoded, Some(Value::String("{bad json".to_string())));
    }

    #[test]
    fn test_form_body_last_occurrence_wins() {
        let decoded = decode_body(Some("a=1&b=two%20words&a=3"), "application/x-www-form-urlencoded");
        assert_eq!(decoded, Some(json!({"a": "3", "b": "two words"})));
    }

    #[test]
    fn test_unknown_content_type_is_raw_text() {
        let decoded = decode_body(Some("hello"), "text/plain");
        assert_eq!(decoded, Some(Value::String("hello".to_string())));
    }
}
