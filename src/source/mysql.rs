//! Direct MySQL accessor for the WordPress database.
//!
//! Connections are scoped to one query: connect, run, close. Sync runs are
//! minutes apart and WordPress hosts tend to cull idle connections, so a
//! held pool buys nothing here.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult, Statement};
use std::time::Duration;
use tracing::debug;

use super::{Row, SourceQueryError, SqlValue, WpSource};

pub struct MysqlSource {
    database_url: String,
    connect_timeout: Duration,
}

impl MysqlSource {
    pub fn new(database_url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            database_url: database_url.into(),
            connect_timeout,
        }
    }

    async fn connect(&self) -> Result<DatabaseConnection, SourceQueryError> {
        let mut options = ConnectOptions::new(self.database_url.clone());
        options
            .max_connections(1)
            .connect_timeout(self.connect_timeout)
            .sqlx_logging(false);
        Database::connect(options)
            .await
            .map_err(|err| SourceQueryError::new(format!("wordpress connection failed: {err}")))
    }
}

#[async_trait]
impl WpSource for MysqlSource {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, SourceQueryError> {
        let db = self.connect().await?;
        let result = db
            .query_all(Statement::from_string(DatabaseBackend::MySql, sql))
            .await
            .map_err(|err| SourceQueryError::new(format!("wordpress query failed: {err}")));
        // Close regardless of the query outcome.
        if let Err(err) = db.close().await {
            debug!(error = %err, "failed to close wordpress connection");
        }
        let rows = result?;
        debug!(rows = rows.len(), "wordpress query returned");
        rows.iter().map(decode_row).collect()
    }
}

/// Decode one driver row into typed cells. Column types are unknown at
/// compile time, so each cell is tried from the narrowest sqlx decoding to
/// the widest; the first that decodes wins.
fn decode_row(result: &QueryResult) -> Result<Row, SourceQueryError> {
    let mut row = Row::new();
    for column in result.column_names() {
        let value = decode_cell(result, &column)
            .ok_or_else(|| SourceQueryError::new(format!("undecodable column `{column}`")))?;
        row.push(column, value);
    }
    Ok(row)
}

fn decode_cell(result: &QueryResult, column: &str) -> Option<SqlValue> {
    if let Ok(v) = result.try_get::<Option<i64>>("", column) {
        return Some(v.map(SqlValue::Integer).unwrap_or(SqlValue::Null));
    }
    if let Ok(v) = result.try_get::<Option<f64>>("", column) {
        return Some(v.map(SqlValue::Float).unwrap_or(SqlValue::Null));
    }
    if let Ok(v) = result.try_get::<Option<NaiveDateTime>>("", column) {
        return Some(v.map(SqlValue::Timestamp).unwrap_or(SqlValue::Null));
    }
    if let Ok(v) = result.try_get::<Option<String>>("", column) {
        return Some(v.map(SqlValue::Text).unwrap_or(SqlValue::Null));
    }
    if let Ok(v) = result.try_get::<Option<Vec<u8>>>("", column) {
        return Some(v.map(SqlValue::Blob).unwrap_or(SqlValue::Null));
    }
    None
}
