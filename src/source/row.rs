//! Typed source rows.
//!
//! WordPress rows arrive either from a MySQL driver or from a json proxy
//! payload. Both are resolved into [`SqlValue`] at this boundary so the engine
//! never handles untyped values. [`Row`] preserves source column order, which
//! the identity fallback and auto-mapping depend on.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::NaiveDateTime;
use serde_json::{Map, Value as JsonValue};

/// Tagged value union for one source cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// String form used as the upsert identity key. `None` for null, empty
    /// text, or values with no sensible key form; such rows are skipped.
    pub fn as_id_string(&self) -> Option<String> {
        match self {
            SqlValue::Null | SqlValue::Blob(_) => None,
            SqlValue::Integer(v) => Some(v.to_string()),
            SqlValue::Float(v) => Some(v.to_string()),
            SqlValue::Text(v) => {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            SqlValue::Timestamp(v) => Some(v.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// Json form written into target records.
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Integer(v) => JsonValue::from(*v),
            SqlValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Text(v) => JsonValue::String(v.clone()),
            SqlValue::Timestamp(v) => {
                JsonValue::String(v.format("%Y-%m-%d %H:%M:%S").to_string())
            }
            SqlValue::Blob(bytes) => JsonValue::String(BASE64.encode(bytes)),
        }
    }

    /// Resolve a json proxy value into a typed cell. Timestamp-shaped strings
    /// are promoted so incremental filters compare like-for-like with the
    /// direct MySQL accessor.
    pub fn from_json(value: &JsonValue) -> SqlValue {
        match value {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else {
                    n.as_f64().map(SqlValue::Float).unwrap_or(SqlValue::Null)
                }
            }
            JsonValue::String(s) => {
                if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                    SqlValue::Timestamp(ts)
                } else {
                    SqlValue::Text(s.clone())
                }
            }
            other => SqlValue::Text(other.to_string()),
        }
    }

    /// Best-effort text form, used when parsing introspection rows.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Text(v) => Some(v.clone()),
            other => other.as_id_string(),
        }
    }
}

/// One source row as an ordered column-name → value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Build a row from a json object, preserving the object's member order.
    pub fn from_json_object(object: &Map<String, JsonValue>) -> Self {
        Self {
            columns: object
                .iter()
                .map(|(name, value)| (name.clone(), SqlValue::from_json(value)))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: SqlValue) {
        self.columns.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn first_column(&self) -> Option<&str> {
        self.columns.first().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The entire row as a json object (generic targets store this blob).
    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::new();
        for (name, value) in &self.columns {
            object.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_string_forms() {
        assert_eq!(SqlValue::Integer(5).as_id_string().as_deref(), Some("5"));
        assert_eq!(
            SqlValue::Text("abc".into()).as_id_string().as_deref(),
            Some("abc")
        );
        assert_eq!(SqlValue::Text("  ".into()).as_id_string(), None);
        assert_eq!(SqlValue::Null.as_id_string(), None);
    }

    #[test]
    fn json_numbers_resolve_to_integer_or_float() {
        assert_eq!(SqlValue::from_json(&json!(42)), SqlValue::Integer(42));
        assert_eq!(SqlValue::from_json(&json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(SqlValue::from_json(&json!(null)), SqlValue::Null);
    }

    #[test]
    fn timestamp_shaped_strings_are_promoted() {
        let value = SqlValue::from_json(&json!("2025-03-01 10:15:00"));
        assert!(matches!(value, SqlValue::Timestamp(_)));
        assert_eq!(value.to_json(), json!("2025-03-01 10:15:00"));
    }

    #[test]
    fn json_object_rows_keep_source_column_order() {
        let value: JsonValue =
            serde_json::from_str(r#"{"zeta_name": "z", "alpha_id": 1, "beta": 2}"#).unwrap();
        let JsonValue::Object(object) = value else {
            panic!("expected object");
        };

        let row = Row::from_json_object(&object);
        assert_eq!(row.first_column(), Some("zeta_name"));
        assert_eq!(
            row.column_names().collect::<Vec<_>>(),
            vec!["zeta_name", "alpha_id", "beta"]
        );
    }

    #[test]
    fn row_preserves_column_order() {
        let mut row = Row::new();
        row.push("zeta", SqlValue::Integer(1));
        row.push("alpha", SqlValue::Integer(2));
        assert_eq!(row.first_column(), Some("zeta"));
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn row_to_json_includes_all_columns() {
        let mut row = Row::new();
        row.push("id", SqlValue::Integer(5));
        row.push("title", SqlValue::Text("Hi".into()));
        row.push("deleted_at", SqlValue::Null);
        assert_eq!(
            row.to_json(),
            json!({"id": 5, "title": "Hi", "deleted_at": null})
        );
    }
}
