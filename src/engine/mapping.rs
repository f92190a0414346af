//! Field mapping between source columns and target fields.
//!
//! A task's mapping is a flat json object of source column → target field.
//! Tasks without a mapping get one derived from the first fetched row
//! (auto-mapping), with fieldnames normalized to lowercase underscore form.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::source::Row;

/// Normalize a source column name into an internal fieldname: lowercase,
/// runs of non-alphanumerics collapsed to single underscores.
pub fn normalize_fieldname(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut last_was_underscore = true; // suppress a leading underscore
    for c in column.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_underscore = false;
        } else if !last_was_underscore {
            out.push('_');
            last_was_underscore = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Human label for an auto-created field: underscore words, title-cased.
pub fn label_from_column(column: &str) -> String {
    normalize_fieldname(column)
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Source column → target fieldname, ordered by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMapping {
    entries: BTreeMap<String, String>,
}

impl FieldMapping {
    /// Parse a task's stored mapping. Anything but a flat object of strings
    /// is a validation error; an absent or empty mapping yields an empty
    /// [`FieldMapping`], which callers replace via [`FieldMapping::auto_map`].
    pub fn parse(value: Option<&JsonValue>) -> Result<Self, EngineError> {
        let Some(value) = value else {
            return Ok(Self::default());
        };
        let object = value.as_object().ok_or_else(|| {
            EngineError::Validation("field_mapping must be a flat JSON object".to_string())
        })?;

        let mut entries = BTreeMap::new();
        for (column, target) in object {
            let target = target.as_str().ok_or_else(|| {
                EngineError::Validation(format!(
                    "field_mapping value for `{column}` must be a string"
                ))
            })?;
            entries.insert(column.clone(), target.to_string());
        }
        Ok(Self { entries })
    }

    /// Derive a mapping from a fetched row: every column maps to its
    /// normalized fieldname.
    pub fn auto_map(row: &Row) -> Self {
        let entries = row
            .column_names()
            .map(|column| (column.to_string(), normalize_fieldname(column)))
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn target_for(&self, column: &str) -> Option<&str> {
        self.entries.get(column).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(column, target)| (column.as_str(), target.as_str()))
    }

    /// The source column mapped to `target`, if any.
    pub fn column_for(&self, target: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, mapped)| mapped.as_str() == target)
            .map(|(column, _)| column.as_str())
    }

    pub fn insert(&mut self, column: impl Into<String>, target: impl Into<String>) {
        self.entries.insert(column.into(), target.into());
    }
}

/// The target fieldname carrying the source identity for doctype targets.
pub const IDENTITY_FIELD_DOCTYPE: &str = "wp_source_id";
/// The target fieldname carrying the source identity for the generic target.
pub const IDENTITY_FIELD_GENERIC: &str = "record_id";

/// Pick the source column whose value identifies each row, in priority order:
/// an explicit mapping to the identity field, a literal `id` column, the
/// first `*_id` column, and finally the row's first column.
pub fn resolve_identity(mapping: &FieldMapping, row: &Row, generic_target: bool) -> Option<String> {
    let identity_field = if generic_target {
        IDENTITY_FIELD_GENERIC
    } else {
        IDENTITY_FIELD_DOCTYPE
    };
    if let Some(column) = mapping.column_for(identity_field) {
        return Some(column.to_string());
    }
    if row.contains("id") {
        return Some("id".to_string());
    }
    if let Some(column) = row
        .column_names()
        .find(|name| name.to_ascii_lowercase().ends_with("_id"))
    {
        return Some(column.to_string());
    }
    row.first_column().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SqlValue;
    use serde_json::json;

    fn row_with(columns: &[&str]) -> Row {
        let mut row = Row::new();
        for column in columns {
            row.push(*column, SqlValue::Integer(1));
        }
        row
    }

    #[test]
    fn normalizes_fieldnames() {
        assert_eq!(normalize_fieldname("Post Title"), "post_title");
        assert_eq!(normalize_fieldname("ID"), "id");
        assert_eq!(normalize_fieldname("meta-key"), "meta_key");
        assert_eq!(normalize_fieldname("__weird__name__"), "weird_name");
    }

    #[test]
    fn labels_are_title_cased() {
        assert_eq!(label_from_column("post_title"), "Post Title");
        assert_eq!(label_from_column("ID"), "Id");
    }

    #[test]
    fn parse_rejects_non_object_mapping() {
        let err = FieldMapping::parse(Some(&json!(["a", "b"]))).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = FieldMapping::parse(Some(&json!({"a": {"nested": true}}))).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn parse_accepts_flat_object() {
        let mapping =
            FieldMapping::parse(Some(&json!({"post_title": "title", "ID": "wp_source_id"})))
                .unwrap();
        assert_eq!(mapping.target_for("post_title"), Some("title"));
        assert_eq!(mapping.column_for("wp_source_id"), Some("ID"));
    }

    #[test]
    fn auto_map_uses_normalized_names() {
        let row = row_with(&["ID", "Post Title"]);
        let mapping = FieldMapping::auto_map(&row);
        assert_eq!(mapping.target_for("ID"), Some("id"));
        assert_eq!(mapping.target_for("Post Title"), Some("post_title"));
    }

    #[test]
    fn identity_prefers_explicit_mapping() {
        let mapping =
            FieldMapping::parse(Some(&json!({"comment_ID": "wp_source_id"}))).unwrap();
        let row = row_with(&["comment_ID", "id"]);
        assert_eq!(
            resolve_identity(&mapping, &row, false).as_deref(),
            Some("comment_ID")
        );
    }

    #[test]
    fn identity_falls_back_to_id_then_suffix_then_first() {
        let mapping = FieldMapping::default();

        let row = row_with(&["name", "id"]);
        assert_eq!(resolve_identity(&mapping, &row, false).as_deref(), Some("id"));

        let row = row_with(&["name", "user_id"]);
        assert_eq!(
            resolve_identity(&mapping, &row, false).as_deref(),
            Some("user_id")
        );

        let row = row_with(&["option_name", "option_value"]);
        assert_eq!(
            resolve_identity(&mapping, &row, true).as_deref(),
            Some("option_name")
        );
    }
}
