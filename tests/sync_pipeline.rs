//! End-to-end pipeline tests: drive the HTTP API against an in-memory
//! database and a scripted WordPress source, and assert on what lands in
//! the document store.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tower::ServiceExt;
use wp_sync::config::AppConfig;
use wp_sync::engine::SyncEngine;
use wp_sync::migration::{Migrator, MigratorTrait};
use wp_sync::models::document;
use wp_sync::server::{AppState, create_app};
use wp_sync::source::{Row, SourceQueryError, SqlValue, WpSource};

const TOKEN: &str = "pipeline-token";

/// Source whose result set can be swapped between runs.
struct MutableSource {
    rows: Mutex<Vec<Row>>,
}

impl MutableSource {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    fn set_rows(&self, rows: Vec<Row>) {
        *self.rows.lock().unwrap() = rows;
    }
}

#[async_trait::async_trait]
impl WpSource for MutableSource {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, SourceQueryError> {
        if sql.starts_with("DESCRIBE") {
            return Ok(Vec::new());
        }
        Ok(self.rows.lock().unwrap().clone())
    }
}

fn post_row(id: i64, title: &str) -> Row {
    Row::from_pairs(vec![
        ("ID".to_string(), SqlValue::Integer(id)),
        ("post_title".to_string(), SqlValue::Text(title.to_string())),
        (
            "post_status".to_string(),
            SqlValue::Text("publish".to_string()),
        ),
    ])
}

async fn setup(source: Arc<MutableSource>) -> (Router, DatabaseConnection) {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let config = Arc::new(AppConfig {
        profile: "test".to_string(),
        operator_tokens: vec![TOKEN.to_string()],
        ..Default::default()
    });
    let engine = Arc::new(SyncEngine::new(db.clone(), source));

    let state = AppState {
        db: db.clone(),
        config,
        engine,
    };
    (create_app(state), db)
}

fn authed(method: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_posts_task(app: &Router) {
    let payload = serde_json::json!({
        "name": "wp-posts",
        "source_table": "wp_posts",
        "target_doctype": "WP Post",
        "field_mapping": {
            "ID": "wp_source_id",
            "post_title": "title",
            "post_status": "status"
        }
    });
    let response = app
        .clone()
        .oneshot(authed("POST", "/tasks", Body::from(payload.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn two_runs_insert_then_update() {
    let source = Arc::new(MutableSource::new(vec![post_row(7, "Hi")]));
    let (app, db) = setup(Arc::clone(&source)).await;
    create_posts_task(&app).await;

    // First run inserts the row.
    let response = app
        .clone()
        .oneshot(authed("POST", "/tasks/wp-posts/run", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let run = json_body(response).await;
    assert_eq!(run["status"], "success");
    assert_eq!(run["rows_inserted"], 1);
    assert_eq!(run["rows_updated"], 0);

    // Second run sees a changed title and updates in place.
    source.set_rows(vec![post_row(7, "Hi2")]);
    let response = app
        .clone()
        .oneshot(authed("POST", "/tasks/wp-posts/run", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let run = json_body(response).await;
    assert_eq!(run["status"], "success");
    assert_eq!(run["rows_inserted"], 0);
    assert_eq!(run["rows_updated"], 1);

    let docs = document::Entity::find()
        .filter(document::Column::Doctype.eq("WP Post"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].wp_source_id, "7");
    assert_eq!(docs[0].fields["title"], "Hi2");
    assert_eq!(docs[0].fields["status"], "publish");
}

#[tokio::test]
async fn scheduled_run_continues_past_failing_task() {
    let source = Arc::new(MutableSource::new(vec![post_row(1, "One")]));
    let (app, _db) = setup(Arc::clone(&source)).await;

    // A task whose source table fails identifier validation always fails.
    let bad = serde_json::json!({
        "name": "a-bad",
        "source_table": "wp_posts; DROP TABLE x",
        "target_doctype": "WP Post",
        "execution_order": 1
    });
    let response = app
        .clone()
        .oneshot(authed("POST", "/tasks", Body::from(bad.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let good = serde_json::json!({
        "name": "b-good",
        "source_table": "wp_posts",
        "target_doctype": "WP Post",
        "field_mapping": { "ID": "wp_source_id", "post_title": "title" },
        "execution_order": 2
    });
    let response = app
        .clone()
        .oneshot(authed("POST", "/tasks", Body::from(good.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(authed("POST", "/sync/run", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let batch = json_body(response).await;
    assert_eq!(batch["succeeded"], 1);
    assert_eq!(batch["failed"], 1);
    assert_eq!(batch["results"][0]["task"], "a-bad");
    assert_eq!(batch["results"][0]["status"], "failed");
    assert_eq!(batch["results"][1]["task"], "b-good");
    assert_eq!(batch["results"][1]["status"], "success");

    // The pass is stamped even though one task failed.
    let response = app
        .oneshot(authed("GET", "/sync/status", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert!(status["last_sync_at"].is_string());
    assert_eq!(status["tasks_total"], 2);
}

#[tokio::test]
async fn generic_target_stores_whole_rows() {
    let source = Arc::new(MutableSource::new(vec![Row::from_pairs(vec![
        ("id".to_string(), SqlValue::Integer(42)),
        (
            "option_name".to_string(),
            SqlValue::Text("blogname".to_string()),
        ),
        (
            "option_value".to_string(),
            SqlValue::Text("My Site".to_string()),
        ),
    ])]));
    let (app, db) = setup(source).await;

    let payload = serde_json::json!({
        "name": "wp-options",
        "source_table": "wp_options",
        "target_doctype": "WP Table Data"
    });
    let response = app
        .clone()
        .oneshot(authed("POST", "/tasks", Body::from(payload.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(authed("POST", "/tasks/wp-options/run", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let run = json_body(response).await;
    assert_eq!(run["status"], "success");
    assert_eq!(run["rows_inserted"], 1);

    let rows = wp_sync::models::wp_table_data::Entity::find()
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].table_name, "wp_options");
    assert_eq!(rows[0].record_id, "42");
    assert_eq!(rows[0].data["option_value"], "My Site");
}
