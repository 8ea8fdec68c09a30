use serde_json::{Map, Value};

/// Candidate fields holding the display text, highest priority first.
pub const RESPONSE_FIELDS: &[&str] = &[
    "response", "answer", "content", "html", "text", "message", "result", "output",
];

/// Shown when a reply carries none of [`RESPONSE_FIELDS`].
pub const EMPTY_RESPONSE: &str = "Received empty response from server.";

/// Pick the display text out of a backend payload.
///
/// The first field in [`RESPONSE_FIELDS`] whose value is populated wins; key
/// order in the payload itself is irrelevant. `null`, `false`, zero, NaN and
/// the empty string count as unpopulated. A payload with no populated field
/// is a normal reply and yields [`EMPTY_RESPONSE`].
pub fn normalize(payload: &Map<String, Value>) -> String {
    RESPONSE_FIELDS
        .iter()
        .filter_map(|field| payload.get(*field))
        .find(|value| is_populated(value))
        .map(display_text)
        .unwrap_or_else(|| EMPTY_RESPONSE.to_string())
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_each_field_alone() {
        for field in RESPONSE_FIELDS {
            let mut payload = Map::new();
            payload.insert(field.to_string(), json!(format!("from {}", field)));
            assert_eq!(normalize(&payload), format!("from {}", field));
        }
    }

    #[test]
    fn test_priority_ignores_key_order() {
        // `output` is listed first in the object but ranks last.
        let payload = obj(json!({
            "output": "o",
            "text": "t",
            "answer": "a"
        }));
        assert_eq!(normalize(&payload), "a");

        let payload = obj(json!({"message": "m", "html": "<p>h</p>"}));
        assert_eq!(normalize(&payload), "<p>h</p>");
    }

    #[test]
    fn test_unpopulated_fields_are_skipped() {
        let payload = obj(json!({
            "response": "",
            "answer": null,
            "content": false,
            "html": 0,
            "text": "fallthrough"
        }));
        assert_eq!(normalize(&payload), "fallthrough");
    }

    #[test]
    fn test_no_fields_yields_fallback() {
        assert_eq!(normalize(&Map::new()), EMPTY_RESPONSE);
        let payload = obj(json!({"sources": [], "api_available": true}));
        assert_eq!(normalize(&payload), EMPTY_RESPONSE);
    }

    #[test]
    fn test_non_string_values_are_formatted() {
        assert_eq!(normalize(&obj(json!({"result": 42}))), "42");
        assert_eq!(normalize(&obj(json!({"output": ["a"]}))), r#"["a"]"#);
    }
}
