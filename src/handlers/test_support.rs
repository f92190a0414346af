//! Shared setup for handler tests: in-memory database, scripted WordPress
//! source, and an application state with a known operator token.

use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::engine::SyncEngine;
use crate::server::AppState;
use crate::source::{Row, SourceQueryError, SqlValue, WpSource};

pub const TEST_TOKEN: &str = "test-token-123";

/// Source that answers data queries with a fixed set of rows and DESCRIBE
/// queries with nothing.
pub struct FixedSource {
    pub rows: Vec<Row>,
}

#[async_trait::async_trait]
impl WpSource for FixedSource {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, SourceQueryError> {
        if sql.starts_with("DESCRIBE") {
            return Ok(Vec::new());
        }
        Ok(self.rows.clone())
    }
}

pub fn sample_row() -> Row {
    Row::from_pairs(vec![
        ("ID".to_string(), SqlValue::Integer(11)),
        (
            "post_title".to_string(),
            SqlValue::Text("Hello".to_string()),
        ),
    ])
}

pub async fn setup_state(rows: Vec<Row>) -> (AppState, DatabaseConnection) {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let config = Arc::new(AppConfig {
        profile: "test".to_string(),
        operator_tokens: vec![TEST_TOKEN.to_string()],
        ..Default::default()
    });

    let engine = Arc::new(SyncEngine::new(db.clone(), Arc::new(FixedSource { rows })));

    (
        AppState {
            db: db.clone(),
            config,
            engine,
        },
        db,
    )
}
