//! Document entity model
//!
//! Schema-backed target records written by the sync engine. The unique pair
//! (doctype, wp_source_id) makes re-sync an update, never a duplicate.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    /// Unique identifier for the document (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Internal schema this document belongs to
    pub doctype: String,

    /// WordPress table the row was synced from
    pub wp_source_table: String,

    /// String form of the source row's identity column
    pub wp_source_id: String,

    /// Timestamp of the last sync that touched this document
    pub wp_synced_at: DateTimeWithTimeZone,

    /// Mapped internal fields as a flat json object
    #[sea_orm(column_type = "JsonBinary")]
    pub fields: JsonValue,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
