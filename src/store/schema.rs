//! Schema registry for doctype targets.
//!
//! Before a doctype sync runs, the source table's columns are reconciled into
//! `doctype_fields`. Reconciliation is additive: unknown columns get a new
//! field row, existing rows are never retyped or removed.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

use super::StoreError;
use crate::models::doctype_field;

/// A field a doctype should carry, derived from one source column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub fieldname: String,
    pub label: String,
    pub fieldtype: &'static str,
    pub wp_column: String,
}

#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Ensure every field in `desired` exists for `doctype`. Returns how many
    /// were added.
    async fn ensure_fields(
        &self,
        doctype: &str,
        desired: &[FieldSpec],
    ) -> Result<usize, StoreError>;
}

pub struct DbSchemaRegistry<'c, C: ConnectionTrait> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> DbSchemaRegistry<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C: ConnectionTrait> SchemaRegistry for DbSchemaRegistry<'_, C> {
    async fn ensure_fields(
        &self,
        doctype: &str,
        desired: &[FieldSpec],
    ) -> Result<usize, StoreError> {
        let existing: Vec<String> = doctype_field::Entity::find()
            .filter(doctype_field::Column::Doctype.eq(doctype))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|field| field.fieldname)
            .collect();

        let mut added = 0;
        for spec in desired {
            if existing.iter().any(|name| name == &spec.fieldname) {
                continue;
            }
            doctype_field::ActiveModel {
                id: Set(Uuid::new_v4()),
                doctype: Set(doctype.to_string()),
                fieldname: Set(spec.fieldname.clone()),
                label: Set(spec.label.clone()),
                fieldtype: Set(spec.fieldtype.to_string()),
                wp_column: Set(spec.wp_column.clone()),
                created_at: Set(Utc::now().fixed_offset()),
            }
            .insert(self.conn)
            .await?;
            added += 1;
        }

        if added > 0 {
            info!(doctype, added, "schema reconciliation added fields");
        }
        Ok(added)
    }
}

/// Map a raw MySQL column type to an internal field type.
pub fn map_mysql_type(column_type: &str) -> &'static str {
    let normalized = column_type.trim().to_ascii_lowercase();
    // `tinyint(1)` is MySQL's boolean convention.
    if normalized.starts_with("tinyint(1)") {
        return "Check";
    }
    let base = normalized
        .split(|c| c == '(' || c == ' ')
        .next()
        .unwrap_or("");
    match base {
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => "Int",
        "decimal" | "numeric" | "float" | "double" => "Float",
        "datetime" | "timestamp" => "Datetime",
        "date" => "Date",
        "time" => "Time",
        "varchar" | "char" | "enum" | "set" => "Data",
        "text" | "tinytext" | "mediumtext" | "longtext" => "Text",
        "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => "Attach",
        _ => "Data",
    }
}
