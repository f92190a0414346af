//! DoctypeField entity model
//!
//! Internal schema registry row: one field of one doctype, recorded by schema
//! reconciliation. Reconciliation is additive only.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "doctype_fields")]
pub struct Model {
    /// Unique identifier for the field row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Doctype this field belongs to
    pub doctype: String,

    /// Normalized internal field name
    pub fieldname: String,

    /// Human-readable label derived from the source column
    pub label: String,

    /// Internal field type (Data, Int, Float, Datetime, ...)
    pub fieldtype: String,

    /// Source column the field was created from
    pub wp_column: String,

    /// Timestamp when the field was added
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
