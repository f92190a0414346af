//! # Task API Handlers
//!
//! Handlers for listing, creating, and manually running sync tasks.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::auth::OperatorAuth;
use crate::error::{ApiError, validation_error};
use crate::models::sync_task::{self, SyncDirection};
use crate::repositories::{NewSyncTask, SyncTaskRepository};
use crate::server::AppState;

use super::sync::TaskRunResponse;

/// Task information response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Unique identifier for the task
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Unique task name
    #[schema(example = "wp-posts")]
    pub name: String,
    /// WordPress table the task reads from
    #[schema(example = "wp_posts")]
    pub source_table: String,
    /// Internal doctype the task writes into
    #[schema(example = "WP Post")]
    pub target_doctype: String,
    /// Column-to-field mapping, null when the task auto-maps
    pub field_mapping: Option<JsonValue>,
    /// Direction of synchronization
    #[schema(example = "wp_to_app")]
    pub sync_direction: String,
    /// Raw filter appended to the read query
    pub where_clause: Option<String>,
    /// Whether repeat runs apply the incremental updated-at filter
    pub use_incremental_sync: bool,
    /// Source column holding the row's last-modified timestamp
    pub updated_at_field: Option<String>,
    /// Fixed UTC offset of source timestamps, e.g. "+02:00"
    pub updated_at_timezone: Option<String>,
    /// Minutes subtracted from the incremental watermark
    pub sync_buffer_minutes: i32,
    /// Whether the scheduler picks this task up
    pub enabled: bool,
    /// Scheduler ordering, ascending
    pub execution_order: i32,
    /// Timestamp of the last run (RFC3339)
    pub last_run_at: Option<String>,
    /// Outcome of the last run
    pub last_run_status: Option<String>,
    /// Rows written by the last run
    pub rows_synced: i32,
    /// Last run's error text
    pub last_error: Option<String>,
}

impl From<sync_task::Model> for TaskInfo {
    fn from(model: sync_task::Model) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name,
            source_table: model.source_table,
            target_doctype: model.target_doctype,
            field_mapping: model.field_mapping,
            sync_direction: model.sync_direction,
            where_clause: model.where_clause,
            use_incremental_sync: model.use_incremental_sync,
            updated_at_field: model.updated_at_field,
            updated_at_timezone: model.updated_at_timezone,
            sync_buffer_minutes: model.sync_buffer_minutes,
            enabled: model.enabled,
            execution_order: model.execution_order,
            last_run_at: model.last_run_at.map(|dt| dt.to_rfc3339()),
            last_run_status: model.last_run_status,
            rows_synced: model.rows_synced,
            last_error: model.last_error,
        }
    }
}

/// Response payload for the task listing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TasksResponse {
    /// All configured tasks in scheduler order
    pub tasks: Vec<TaskInfo>,
}

/// Request payload for creating a task
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// Unique task name
    #[schema(example = "wp-posts")]
    pub name: String,
    /// WordPress table to read from
    #[schema(example = "wp_posts")]
    pub source_table: String,
    /// Internal doctype to write into ("WP Table Data" selects generic storage)
    #[schema(example = "WP Post")]
    pub target_doctype: String,
    /// Flat column-to-field mapping object; omit to auto-map
    pub field_mapping: Option<JsonValue>,
    /// Direction of synchronization (default: wp_to_app)
    pub sync_direction: Option<String>,
    /// Raw filter appended to the read query
    pub where_clause: Option<String>,
    /// Apply the incremental updated-at filter on repeat runs (default: false)
    pub use_incremental_sync: Option<bool>,
    /// Source column holding the row's last-modified timestamp
    pub updated_at_field: Option<String>,
    /// Fixed UTC offset of source timestamps, e.g. "+02:00"
    pub updated_at_timezone: Option<String>,
    /// Minutes subtracted from the incremental watermark (default: 3)
    pub sync_buffer_minutes: Option<i32>,
    /// Whether the scheduler picks this task up (default: true)
    pub enabled: Option<bool>,
    /// Scheduler ordering, ascending (default: 0)
    pub execution_order: Option<i32>,
}

/// List all configured tasks
#[utoipa::path(
    get,
    path = "/tasks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All configured tasks", body = TasksResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<TasksResponse>, ApiError> {
    let repo = SyncTaskRepository::new(state.db.clone());
    let tasks = repo.list_all().await?;

    Ok(Json(TasksResponse {
        tasks: tasks.into_iter().map(TaskInfo::from).collect(),
    }))
}

/// Create a new sync task
#[utoipa::path(
    post,
    path = "/tasks",
    security(("bearer_auth" = [])),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskInfo),
        (status = 400, description = "Invalid task definition", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 409, description = "A task with this name already exists", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskInfo>), ApiError> {
    let sync_direction = match payload.sync_direction.as_deref() {
        None => SyncDirection::WpToApp,
        Some(raw) => SyncDirection::from_str(raw).map_err(|message| {
            validation_error(
                "Invalid sync_direction",
                serde_json::json!({ "sync_direction": message }),
            )
        })?,
    };

    let repo = SyncTaskRepository::new(state.db.clone());
    let task = repo
        .create(NewSyncTask {
            name: payload.name,
            source_table: payload.source_table,
            target_doctype: payload.target_doctype,
            field_mapping: payload.field_mapping,
            sync_direction,
            where_clause: payload.where_clause,
            use_incremental_sync: payload.use_incremental_sync.unwrap_or(false),
            updated_at_field: payload.updated_at_field,
            updated_at_timezone: payload.updated_at_timezone,
            sync_buffer_minutes: payload.sync_buffer_minutes.unwrap_or(3),
            enabled: payload.enabled.unwrap_or(true),
            execution_order: payload.execution_order.unwrap_or(0),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TaskInfo::from(task))))
}

/// Run one task immediately, outside the scheduler
#[utoipa::path(
    post,
    path = "/tasks/{name}/run",
    security(("bearer_auth" = [])),
    params(
        ("name" = String, Path, description = "Name of the task to run")
    ),
    responses(
        (status = 200, description = "Run outcome", body = TaskRunResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "No task with this name", body = ApiError),
        (status = 409, description = "Task is disabled or already running", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "tasks"
)]
pub async fn run_task(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(name): Path<String>,
) -> Result<Json<TaskRunResponse>, ApiError> {
    let result = state.engine.run_single_task(&name).await?;
    Ok(Json(TaskRunResponse::from(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{TEST_TOKEN, sample_row, setup_state};
    use crate::server::create_app;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    fn create_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/tasks")
            .header(header::AUTHORIZATION, format!("Bearer {}", TEST_TOKEN))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn list_tasks_requires_auth() {
        let (state, _db) = setup_state(Vec::new()).await;
        let app = create_app(state);

        let request = Request::builder()
            .method("GET")
            .uri("/tasks")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let (state, _db) = setup_state(Vec::new()).await;
        let app = create_app(state);

        let response = app
            .clone()
            .oneshot(create_request(serde_json::json!({
                "name": "wp-posts",
                "source_table": "wp_posts",
                "target_doctype": "WP Post",
                "field_mapping": { "ID": "wp_source_id", "post_title": "title" }
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let request = Request::builder()
            .method("GET")
            .uri("/tasks")
            .header(header::AUTHORIZATION, format!("Bearer {}", TEST_TOKEN))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let tasks_response: TasksResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(tasks_response.tasks.len(), 1);
        let task = &tasks_response.tasks[0];
        assert_eq!(task.name, "wp-posts");
        assert_eq!(task.sync_direction, "wp_to_app");
        assert!(task.enabled);
        assert_eq!(task.sync_buffer_minutes, 3);
        assert!(task.last_run_at.is_none());
    }

    #[tokio::test]
    async fn create_rejects_unknown_direction() {
        let (state, _db) = setup_state(Vec::new()).await;
        let app = create_app(state);

        let response = app
            .oneshot(create_request(serde_json::json!({
                "name": "wp-posts",
                "source_table": "wp_posts",
                "target_doctype": "WP Post",
                "sync_direction": "frappe_to_wp"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn create_rejects_duplicate_name() {
        let (state, _db) = setup_state(Vec::new()).await;
        let app = create_app(state);

        let payload = serde_json::json!({
            "name": "wp-posts",
            "source_table": "wp_posts",
            "target_doctype": "WP Post"
        });

        let response = app
            .clone()
            .oneshot(create_request(payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.oneshot(create_request(payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn run_unknown_task_returns_404() {
        let (state, _db) = setup_state(Vec::new()).await;
        let app = create_app(state);

        let request = Request::builder()
            .method("POST")
            .uri("/tasks/nope/run")
            .header(header::AUTHORIZATION, format!("Bearer {}", TEST_TOKEN))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn run_task_reports_counters() {
        let (state, _db) = setup_state(vec![sample_row()]).await;
        let app = create_app(state);

        let response = app
            .clone()
            .oneshot(create_request(serde_json::json!({
                "name": "wp-posts",
                "source_table": "wp_posts",
                "target_doctype": "WP Post",
                "field_mapping": { "ID": "wp_source_id", "post_title": "title" }
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let request = Request::builder()
            .method("POST")
            .uri("/tasks/wp-posts/run")
            .header(header::AUTHORIZATION, format!("Bearer {}", TEST_TOKEN))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let run: TaskRunResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(run.task, "wp-posts");
        assert_eq!(run.status, "success");
        assert_eq!(run.rows_processed, 1);
        assert_eq!(run.rows_inserted, 1);
        assert!(run.log_id.is_some());
    }
}
