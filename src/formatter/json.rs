//! JSON formatting for MongoDB documents
//!
//! This module renders documents as relaxed extended JSON:
//! - Pretty-printed output for samples and single documents
//! - Inline output (`{"a": 1, "b": [1, 2]}`) for filters and value lists
//!
//! Relaxed extended JSON keeps ObjectIds and dates recognizable
//! (`{"$oid": ...}`, `{"$date": ...}`), so a value copied from a result can be
//! passed back as a call argument unchanged.

use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::Value;

use crate::error::{DispatchError, Result};

/// JSON formatter with pretty printing support
pub struct JsonFormatter {
    /// Indentation width for pretty output
    indent: usize,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    ///
    /// # Arguments
    /// * `indent` - Indentation width for pretty output
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }

    /// Format documents as a pretty JSON array
    pub fn format_documents(&self, docs: &[Document]) -> Result<String> {
        let values: Vec<Value> = docs.iter().map(document_to_json).collect();
        self.to_pretty_string(&values)
    }

    /// Format a single document as a pretty JSON object
    pub fn format_document(&self, doc: &Document) -> Result<String> {
        self.to_pretty_string(&document_to_json(doc))
    }

    /// Convert a value to pretty-printed JSON with custom indentation
    fn to_pretty_string<T: Serialize>(&self, value: &T) -> Result<String> {
        let mut buf = Vec::new();
        let indent = " ".repeat(self.indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value
            .serialize(&mut ser)
            .map_err(|e| DispatchError::Generic(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| DispatchError::Generic(e.to_string()))
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Relaxed extended JSON form of a document
pub fn document_to_json(doc: &Document) -> Value {
    Bson::Document(doc.clone()).into_relaxed_extjson()
}

/// Single-line rendering of a document, with a space after `:` and `,`
pub fn inline_document(doc: &Document) -> String {
    inline_value(&document_to_json(doc))
}

/// Single-line rendering of a list of values
pub fn inline_values(values: &[Bson]) -> String {
    let json = Value::Array(
        values
            .iter()
            .map(|v| v.clone().into_relaxed_extjson())
            .collect(),
    );
    inline_value(&json)
}

/// Single-line rendering of a JSON value
pub fn inline_value(value: &Value) -> String {
    let mut out = String::new();
    write_inline(value, &mut out);
    out
}

fn write_inline(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_inline(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push_str(": ");
                write_inline(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{DateTime, doc, oid::ObjectId};

    #[test]
    fn test_pretty_document_keeps_field_order() {
        let formatter = JsonFormatter::default();
        let result = formatter
            .format_document(&doc! { "name": "test", "value": 42 })
            .unwrap();
        assert_eq!(result, "{\n  \"name\": \"test\",\n  \"value\": 42\n}");
    }

    #[test]
    fn test_object_id_is_extended_json() {
        let formatter = JsonFormatter::new(2);
        let oid = ObjectId::parse_str("65705d84dfc3f3b5094e1f72").unwrap();
        let result = formatter.format_documents(&[doc! { "_id": oid }]).unwrap();
        assert!(result.contains("\"$oid\": \"65705d84dfc3f3b5094e1f72\""));
    }

    #[test]
    fn test_datetime_is_iso_string() {
        let dt = DateTime::from_millis(1701862788373);
        let result = inline_document(&doc! { "created": dt });
        assert!(result.contains("\"$date\""));
        assert!(result.contains("2023-12-06"));
    }

    #[test]
    fn test_inline_spacing() {
        assert_eq!(
            inline_document(&doc! { "status": "paid", "tags": ["a", "b"] }),
            r#"{"status": "paid", "tags": ["a", "b"]}"#
        );
        assert_eq!(
            inline_values(&[Bson::Int32(1), Bson::String("x".into()), Bson::Null]),
            r#"[1, "x", null]"#
        );
    }

    #[test]
    fn test_inline_escapes_strings() {
        assert_eq!(
            inline_values(&[Bson::String("say \"hi\"".into())]),
            r#"["say \"hi\""]"#
        );
    }
}
