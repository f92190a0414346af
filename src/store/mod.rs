//! Internal document store.
//!
//! The engine writes synced rows through [`DocumentStore`], keyed by the
//! target and the source row's identity string. Doctype targets land in the
//! `documents` table as field objects; the generic target keeps the whole
//! source row as one blob in `wp_table_data`. Schema reconciliation for
//! doctype targets goes through [`SchemaRegistry`].

pub mod db;
pub mod schema;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

pub use db::DbDocumentStore;
pub use schema::{DbSchemaRegistry, FieldSpec, SchemaRegistry, map_mysql_type};

/// Where a sync task writes.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncTarget {
    /// A named doctype; mapped fields are stored individually.
    Doctype {
        doctype: String,
        source_table: String,
    },
    /// The generic catch-all; the full source row is stored as one blob.
    Generic { source_table: String },
}

impl SyncTarget {
    pub fn source_table(&self) -> &str {
        match self {
            SyncTarget::Doctype { source_table, .. } | SyncTarget::Generic { source_table } => {
                source_table
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Write-side of the document store. One instance wraps one transaction, so
/// a whole task batch commits or rolls back together.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, target: &SyncTarget, source_id: &str) -> Result<bool, StoreError>;

    /// Stored field object for a record, if present. Used by updates and by
    /// tests asserting on stored state.
    async fn get(
        &self,
        target: &SyncTarget,
        source_id: &str,
    ) -> Result<Option<JsonValue>, StoreError>;

    async fn insert(
        &self,
        target: &SyncTarget,
        source_id: &str,
        fields: Map<String, JsonValue>,
    ) -> Result<(), StoreError>;

    /// Update an existing record. Doctype targets merge `fields` into the
    /// stored object (untouched keys survive); the generic target replaces
    /// the stored blob.
    async fn save(
        &self,
        target: &SyncTarget,
        source_id: &str,
        fields: Map<String, JsonValue>,
    ) -> Result<(), StoreError>;
}
