//! # Sync API Handlers
//!
//! Handlers for triggering sync runs and inspecting recent activity.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::auth::OperatorAuth;
use crate::engine::{BatchRunResult, TaskRunResult};
use crate::error::{ApiError, validation_error};
use crate::models::sync_log;
use crate::repositories::{SettingsRepository, SyncLogRepository, SyncTaskRepository};
use crate::server::AppState;

/// How many recent log rows the status endpoint returns.
const STATUS_RECENT_RUNS: u64 = 10;

/// Outcome of one task run
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskRunResponse {
    /// Name of the task that ran
    #[schema(example = "wp-posts")]
    pub task: String,
    /// Terminal status of the run
    #[schema(example = "success")]
    pub status: String,
    /// Rows fetched from the source
    pub rows_processed: i32,
    /// Rows inserted into the document store
    pub rows_inserted: i32,
    /// Rows updated in the document store
    pub rows_updated: i32,
    /// Rows that did not land: no usable identity, or the write errored
    pub rows_skipped: i32,
    /// The subset of skipped rows whose write errored
    pub rows_failed: i32,
    /// Task-level error text for failed runs
    pub error: Option<String>,
    /// Identifier of the sync log row for this run
    pub log_id: Option<String>,
}

impl From<TaskRunResult> for TaskRunResponse {
    fn from(result: TaskRunResult) -> Self {
        Self {
            task: result.task_name,
            status: result.status,
            rows_processed: result.counts.fetched,
            rows_inserted: result.counts.inserted,
            rows_updated: result.counts.updated,
            rows_skipped: result.counts.skipped_total(),
            rows_failed: result.counts.failed,
            error: result.error,
            log_id: result.log_id.map(|id| id.to_string()),
        }
    }
}

/// Outcome of a run over several tasks
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchRunResponse {
    /// Number of tasks that succeeded
    pub succeeded: usize,
    /// Number of tasks that failed
    pub failed: usize,
    /// Per-task outcomes in execution order
    pub results: Vec<TaskRunResponse>,
}

impl From<BatchRunResult> for BatchRunResponse {
    fn from(batch: BatchRunResult) -> Self {
        Self {
            succeeded: batch.succeeded(),
            failed: batch.failed(),
            results: batch
                .results
                .into_iter()
                .map(TaskRunResponse::from)
                .collect(),
        }
    }
}

/// Request payload for running a named subset of tasks
#[derive(Debug, Deserialize, ToSchema)]
pub struct RunBatchRequest {
    /// Names of the tasks to run, in the requested order
    pub tasks: Vec<String>,
}

/// One recent sync log entry
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogInfo {
    /// Identifier of the log row
    pub id: String,
    /// Task this execution belongs to
    pub task_name: String,
    /// running | success | failed
    pub status: String,
    /// Timestamp when the execution started (RFC3339)
    pub started_at: String,
    /// Timestamp when the execution finished (RFC3339)
    pub completed_at: Option<String>,
    /// Wall-clock duration in seconds
    pub duration_seconds: Option<f64>,
    pub rows_processed: i32,
    pub rows_inserted: i32,
    pub rows_updated: i32,
    pub rows_skipped: i32,
    pub rows_failed: i32,
    /// Task-level error text for failed executions
    pub error_message: Option<String>,
    /// Structured details, e.g. per-row error summaries
    pub log_details: Option<JsonValue>,
}

impl From<sync_log::Model> for LogInfo {
    fn from(model: sync_log::Model) -> Self {
        Self {
            id: model.id.to_string(),
            task_name: model.task_name,
            status: model.status,
            started_at: model.started_at.to_rfc3339(),
            completed_at: model.completed_at.map(|dt| dt.to_rfc3339()),
            duration_seconds: model.duration_seconds,
            rows_processed: model.rows_processed,
            rows_inserted: model.rows_inserted,
            rows_updated: model.rows_updated,
            rows_skipped: model.rows_skipped,
            rows_failed: model.rows_failed,
            error_message: model.error_message,
            log_details: model.log_details,
        }
    }
}

/// Response payload for the sync status endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncStatusResponse {
    /// Whether scheduled syncing is enabled
    pub sync_enabled: bool,
    /// Timestamp of the last scheduled sync pass (RFC3339)
    pub last_sync_at: Option<String>,
    /// Total number of configured tasks
    pub tasks_total: u64,
    /// Number of tasks the scheduler picks up
    pub tasks_enabled: u64,
    /// Most recent task executions, newest first
    pub recent_runs: Vec<LogInfo>,
}

/// Run all enabled tasks now, as a scheduled pass would
#[utoipa::path(
    post,
    path = "/sync/run",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Per-task outcomes", body = BatchRunResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn run_all(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<BatchRunResponse>, ApiError> {
    let batch = state.engine.run_scheduled_sync().await?;
    Ok(Json(BatchRunResponse::from(batch)))
}

/// Run a named subset of tasks in the requested order
#[utoipa::path(
    post,
    path = "/sync/run-batch",
    security(("bearer_auth" = [])),
    request_body = RunBatchRequest,
    responses(
        (status = 200, description = "Per-task outcomes", body = BatchRunResponse),
        (status = 400, description = "Empty task list", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn run_batch(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Json(payload): Json<RunBatchRequest>,
) -> Result<Json<BatchRunResponse>, ApiError> {
    if payload.tasks.is_empty() {
        return Err(validation_error(
            "No tasks requested",
            serde_json::json!({ "tasks": "must name at least one task" }),
        ));
    }

    let batch = state.engine.run_multiple_tasks(&payload.tasks).await?;
    Ok(Json(BatchRunResponse::from(batch)))
}

/// Summary of sync state and recent activity
#[utoipa::path(
    get,
    path = "/sync/status",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current sync status", body = SyncStatusResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn sync_status(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    let settings = SettingsRepository::new(state.db.clone()).load_or_init().await?;
    let tasks = SyncTaskRepository::new(state.db.clone());
    let logs = SyncLogRepository::new(state.db.clone());

    let tasks_total = tasks.count_all().await?;
    let tasks_enabled = tasks.count_enabled().await?;
    let recent = logs.recent(STATUS_RECENT_RUNS).await?;

    Ok(Json(SyncStatusResponse {
        sync_enabled: settings.sync_enabled,
        last_sync_at: settings.last_sync_at.map(|dt| dt.to_rfc3339()),
        tasks_total,
        tasks_enabled,
        recent_runs: recent.into_iter().map(LogInfo::from).collect(),
    }))
}
