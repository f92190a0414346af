//! SyncLog entity model
//!
//! One row per task execution attempt. Created in the Running state before
//! the engine does any work, so a crash mid-task still leaves an audit trail,
//! and completed exactly once with counters.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_logs")]
pub struct Model {
    /// Unique identifier for the log entry (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Name of the task this execution belongs to
    pub task_name: String,

    /// running | success | failed; running is the only non-terminal state
    pub status: String,

    /// Timestamp when the execution started
    pub started_at: DateTimeWithTimeZone,

    /// Timestamp when the execution reached a terminal state
    pub completed_at: Option<DateTimeWithTimeZone>,

    /// Derived completed_at − started_at
    pub duration_seconds: Option<f64>,

    pub rows_processed: i32,
    pub rows_inserted: i32,
    pub rows_updated: i32,
    pub rows_skipped: i32,
    pub rows_failed: i32,

    /// Task-level error text for failed executions
    pub error_message: Option<String>,

    /// Optional structured details, e.g. per-row error summaries
    #[sea_orm(column_type = "JsonBinary")]
    pub log_details: Option<JsonValue>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
