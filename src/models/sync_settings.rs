//! SyncSettings entity model
//!
//! Single-row table (id = 1) holding the global sync switch and the timestamp
//! of the last completed scheduled run. Read at orchestrator start, written
//! once at orchestrator end.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Primary key of the singleton settings row.
pub const SETTINGS_ROW_ID: i16 = 1;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i16,

    /// Global switch; scheduled sync is a logged no-op when false
    pub sync_enabled: bool,

    /// Timestamp of the last completed scheduled run
    pub last_sync_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
