//! WpTableData entity model
//!
//! Generic storage for rows synced from any WordPress table: the entire source
//! row is kept as one json blob keyed by (table_name, record_id).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wp_table_data")]
pub struct Model {
    /// Unique identifier for the record (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// WordPress table the row was synced from
    pub table_name: String,

    /// String form of the source row's identity column
    pub record_id: String,

    /// Entire source row as a json object
    #[sea_orm(column_type = "JsonBinary")]
    pub data: JsonValue,

    /// Timestamp of the last sync that touched this record
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
