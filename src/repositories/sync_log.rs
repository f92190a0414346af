//! # SyncLog Repository
//!
//! Repository operations for the sync_logs table. A log row is inserted in
//! `running` state before work starts and completed exactly once, so an
//! operator can always see in-flight runs.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::sync_log::{
    ActiveModel, Column, Entity, Model, STATUS_FAILED, STATUS_RUNNING, STATUS_SUCCESS,
};

/// Final counters and outcome for one run.
#[derive(Debug, Clone, Default)]
pub struct LogCompletion {
    pub success: bool,
    pub rows_processed: i32,
    pub rows_inserted: i32,
    pub rows_updated: i32,
    pub rows_skipped: i32,
    pub rows_failed: i32,
    pub error_message: Option<String>,
    pub details: Option<JsonValue>,
}

/// Repository for sync log database operations
pub struct SyncLogRepository {
    db: DatabaseConnection,
}

impl SyncLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open a log for a starting run. Inserted on the main connection, not
    /// the batch transaction, so the `running` row is visible immediately.
    pub async fn start(&self, task_name: &str) -> Result<Model, DbErr> {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            task_name: Set(task_name.to_string()),
            status: Set(STATUS_RUNNING.to_string()),
            started_at: Set(Utc::now().fixed_offset()),
            completed_at: Set(None),
            duration_seconds: Set(None),
            rows_processed: Set(0),
            rows_inserted: Set(0),
            rows_updated: Set(0),
            rows_skipped: Set(0),
            rows_failed: Set(0),
            error_message: Set(None),
            log_details: Set(None),
        }
        .insert(&self.db)
        .await
    }

    /// Close a log with its final counters. Consumes the model so a run
    /// cannot complete the same log twice.
    pub async fn complete(&self, log: Model, outcome: LogCompletion) -> Result<Model, DbErr> {
        let completed_at = Utc::now().fixed_offset();
        let duration = (completed_at - log.started_at).num_milliseconds() as f64 / 1000.0;

        let mut active: ActiveModel = log.into();
        active.status = Set(if outcome.success {
            STATUS_SUCCESS.to_string()
        } else {
            STATUS_FAILED.to_string()
        });
        active.completed_at = Set(Some(completed_at));
        active.duration_seconds = Set(Some(duration));
        active.rows_processed = Set(outcome.rows_processed);
        active.rows_inserted = Set(outcome.rows_inserted);
        active.rows_updated = Set(outcome.rows_updated);
        active.rows_skipped = Set(outcome.rows_skipped);
        active.rows_failed = Set(outcome.rows_failed);
        active.error_message = Set(outcome.error_message);
        active.log_details = Set(outcome.details);
        active.update(&self.db).await
    }

    /// Most recent logs, newest first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .order_by_desc(Column::StartedAt)
            .limit(limit)
            .all(&self.db)
            .await
    }

    /// Delete logs older than `days`. Returns how many were removed.
    pub async fn cleanup_older_than(&self, days: i64) -> Result<u64, DbErr> {
        let cutoff = (Utc::now() - chrono::Duration::days(days)).fixed_offset();
        let result = Entity::delete_many()
            .filter(Column::StartedAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        if result.rows_affected > 0 {
            tracing::info!(removed = result.rows_affected, "Old sync logs cleaned up");
        }
        Ok(result.rows_affected)
    }
}
