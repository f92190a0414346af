//! SyncTask entity model
//!
//! This module contains the SeaORM entity model for the sync_tasks table,
//! which configures one synchronization unit between a WordPress table and an
//! internal doctype, plus the task's mutable run state.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Target doctype value that selects generic row storage (`wp_table_data`)
/// instead of a schema-backed document. Changes upsert-key semantics.
pub const GENERIC_TARGET_DOCTYPE: &str = "WP Table Data";

/// SyncTask entity representing one configured synchronization unit
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_tasks")]
pub struct Model {
    /// Unique identifier for the task (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique human-assigned task name
    #[sea_orm(unique)]
    pub name: String,

    /// WordPress table or view to read from
    pub source_table: String,

    /// Internal doctype to write into
    pub target_doctype: String,

    /// Column-to-field mapping as a flat json object; null triggers auto-mapping
    #[sea_orm(column_type = "JsonBinary")]
    pub field_mapping: Option<JsonValue>,

    /// Direction of synchronization (wp_to_app, app_to_wp, bidirectional)
    pub sync_direction: String,

    /// Raw filter fragment appended to the read query
    pub where_clause: Option<String>,

    /// Whether to apply the incremental updated-at filter on repeat runs
    pub use_incremental_sync: bool,

    /// Source column holding the row's last-modified timestamp
    pub updated_at_field: Option<String>,

    /// Fixed UTC offset of the source timestamps, e.g. "+02:00"
    pub updated_at_timezone: Option<String>,

    /// Minutes subtracted from last_run_at to tolerate clock skew
    pub sync_buffer_minutes: i32,

    /// Whether the scheduler picks this task up
    pub enabled: bool,

    /// Tasks run in ascending execution_order (ties broken by name)
    pub execution_order: i32,

    /// Timestamp of the last run, also the incremental watermark
    pub last_run_at: Option<DateTimeWithTimeZone>,

    /// Outcome of the last run (success or failed)
    pub last_run_status: Option<String>,

    /// Rows processed by the last run
    pub rows_synced: i32,

    /// Last run's error text, truncated for storage
    pub last_error: Option<String>,

    /// Timestamp when the task was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the task was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this task writes into the generic row store.
    pub fn is_generic_target(&self) -> bool {
        self.target_doctype == GENERIC_TARGET_DOCTYPE
    }

    /// Parse the stored direction string into the closed direction set.
    pub fn direction(&self) -> SyncDirection {
        SyncDirection::from_str(&self.sync_direction).unwrap_or(SyncDirection::WpToApp)
    }
}

/// Closed set of synchronization directions. Only WP→App is implemented;
/// the other variants dispatch to an explicit not-implemented failure so a
/// future handler is a new match arm, not a restructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    WpToApp,
    AppToWp,
    Bidirectional,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::WpToApp => "wp_to_app",
            SyncDirection::AppToWp => "app_to_wp",
            SyncDirection::Bidirectional => "bidirectional",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "wp_to_app" => Ok(SyncDirection::WpToApp),
            "app_to_wp" => Ok(SyncDirection::AppToWp),
            "bidirectional" => Ok(SyncDirection::Bidirectional),
            other => Err(format!("unknown sync direction '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips() {
        for direction in [
            SyncDirection::WpToApp,
            SyncDirection::AppToWp,
            SyncDirection::Bidirectional,
        ] {
            assert_eq!(
                SyncDirection::from_str(direction.as_str()).unwrap(),
                direction
            );
        }
    }

    #[test]
    fn unknown_direction_is_rejected() {
        assert!(SyncDirection::from_str("frappe_to_wp").is_err());
    }
}
