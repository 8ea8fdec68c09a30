use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Bucket for sources that arrive without a document identifier.
pub const UNKNOWN_DOCUMENT: &str = "unknown";

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Serialized as `null` when no document is selected.
    pub document: Option<String>,
}

/// A loosely typed label: the backend sends page numbers, section ids and
/// even document ids either as JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Number(serde_json::Number),
    Text(String),
}

impl Label {
    /// Empty strings and zero count as absent.
    pub fn is_present(&self) -> bool {
        match self {
            Label::Text(s) => !s.is_empty(),
            Label::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Number(n) => write!(f, "{}", n),
            Label::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<u64> for Label {
    fn from(n: u64) -> Self {
        Label::Number(n.into())
    }
}

/// One citation returned alongside an answer. Every field is read
/// leniently: a value of an unexpected JSON type reads as absent instead of
/// rejecting the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(default, deserialize_with = "lenient_label")]
    pub document: Option<Label>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub page: Option<Label>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub section: Option<Label>,
    /// Expected in [0, 1]; numeric strings such as `"0.9"` are accepted.
    #[serde(default, deserialize_with = "lenient_number")]
    pub relevance: Option<f64>,
}

/// Strings and numbers become labels; null, booleans, arrays and objects don't.
fn lenient_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Label>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(Label::Text(s)),
        Value::Number(n) => Some(Label::Number(n)),
        _ => None,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    lenient_label(deserializer).map(|label| label.map(|l| l.to_string()))
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

impl SourceRecord {
    /// Grouping key, falling back to [`UNKNOWN_DOCUMENT`].
    pub fn document_id(&self) -> String {
        present(&self.document)
            .map(|d| d.to_string())
            .unwrap_or_else(|| UNKNOWN_DOCUMENT.to_string())
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn page(&self) -> Option<&Label> {
        present(&self.page)
    }

    pub fn section(&self) -> Option<&Label> {
        present(&self.section)
    }

    /// Relevance as a rounded whole percentage; zero and NaN count as absent.
    pub fn relevance_percent(&self) -> Option<i64> {
        self.relevance
            .filter(|r| *r != 0.0 && !r.is_nan())
            .map(|r| (r * 100.0).round() as i64)
    }
}

fn present(label: &Option<Label>) -> Option<&Label> {
    label.as_ref().filter(|l| l.is_present())
}

/// A backend reply. The display text lives under one of several field names
/// (see [`super::normalize`]) so the raw object is kept as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub payload: Map<String, Value>,
    pub api_available: bool,
    pub sources: Vec<SourceRecord>,
}

impl ChatResponse {
    /// Lenient conversion: a non-object payload has no fields, a missing or
    /// malformed `sources` list is empty and entries that are not objects
    /// are skipped.
    pub fn from_value(value: Value) -> Self {
        let payload = match value {
            Value::Object(map) => map,
            other => {
                warn!(kind = json_kind(&other), "Chat payload is not an object");
                Map::new()
            }
        };

        let api_available = payload
            .get("api_available")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let sources = payload
            .get("sources")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .filter_map(|(i, entry)| {
                        if !entry.is_object() {
                            warn!(index = i, kind = json_kind(entry), "Skipping source entry that is not an object");
                            return None;
                        }
                        match serde_json::from_value::<SourceRecord>(entry.clone()) {
                            Ok(record) => Some(record),
                            Err(e) => {
                                warn!(index = i, "Skipping unreadable source entry: {}", e);
                                None
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            payload,
            api_available,
            sources,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_null_document() {
        let req = ChatRequest {
            message: "What is the refuel procedure for aircraft X?".to_string(),
            document: None,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"message":"What is the refuel procedure for aircraft X?","document":null}"#
        );
    }

    #[test]
    fn test_source_defaults() {
        let record: SourceRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.document_id(), UNKNOWN_DOCUMENT);
        assert_eq!(record.title(), None);
        assert_eq!(record.content(), "");
        assert!(record.page().is_none());
        assert!(record.relevance_percent().is_none());
    }

    #[test]
    fn test_labels_accept_numbers_and_strings() {
        let record: SourceRecord = serde_json::from_value(json!({
            "document": 42,
            "page": "12-3",
            "section": 4
        }))
        .unwrap();
        assert_eq!(record.document_id(), "42");
        assert_eq!(record.page().unwrap().to_string(), "12-3");
        assert_eq!(record.section().unwrap().to_string(), "4");
    }

    #[test]
    fn test_empty_and_zero_labels_are_absent() {
        let record: SourceRecord = serde_json::from_value(json!({
            "document": "",
            "title": "",
            "page": 0,
            "section": "",
            "relevance": 0.0
        }))
        .unwrap();
        assert_eq!(record.document_id(), UNKNOWN_DOCUMENT);
        assert_eq!(record.title(), None);
        assert!(record.page().is_none());
        assert!(record.section().is_none());
        assert!(record.relevance_percent().is_none());
    }

    #[test]
    fn test_relevance_rounding() {
        let record = SourceRecord {
            relevance: Some(0.864),
            ..Default::default()
        };
        assert_eq!(record.relevance_percent(), Some(86));

        let record = SourceRecord {
            relevance: Some(0.125),
            ..Default::default()
        };
        assert_eq!(record.relevance_percent(), Some(13));
    }

    #[test]
    fn test_response_from_value() {
        let resp = ChatResponse::from_value(json!({
            "answer": "Ground the aircraft first.",
            "api_available": true,
            "sources": [
                {"document": "TO-1-1", "page": 12},
                "not a source",
                ["TO-2", 3],
                {"document": "TO-2", "relevance": "high"}
            ]
        }));
        assert!(resp.api_available);
        assert_eq!(resp.sources.len(), 2);
        assert_eq!(resp.sources[0].document_id(), "TO-1-1");
        assert_eq!(resp.sources[1].document_id(), "TO-2");
        assert!(resp.sources[1].relevance_percent().is_none());
    }

    #[test]
    fn test_response_lenient_shapes() {
        let resp = ChatResponse::from_value(json!({"sources": {"document": "x"}, "api_available": "yes"}));
        assert!(!resp.api_available);
        assert!(resp.sources.is_empty());

        let resp = ChatResponse::from_value(json!("plain text"));
        assert!(resp.payload.is_empty());
        assert!(resp.sources.is_empty());
    }

    #[test]
    fn test_mistyped_fields_keep_the_record() {
        let resp = ChatResponse::from_value(json!({
            "answer": "a",
            "sources": [
                {"document": "TO-1-1", "page": 12, "relevance": "0.9"},
                {"document": "TO-2", "title": 7},
                {"document": "TO-3", "content": 42},
                {"document": "TO-4", "page": true, "section": [1], "title": {"x": 1}}
            ]
        }));
        assert_eq!(resp.sources.len(), 4);
        assert_eq!(resp.sources[0].relevance_percent(), Some(90));
        assert_eq!(resp.sources[1].title(), Some("7"));
        assert_eq!(resp.sources[2].content(), "42");
        assert!(resp.sources[3].page().is_none());
        assert!(resp.sources[3].section().is_none());
        assert_eq!(resp.sources[3].title(), None);

        let groups = crate::chat::sources::group_sources(&resp.sources);
        let keys: Vec<_> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["TO-1-1", "TO-2", "TO-3", "TO-4"]);
    }
}
