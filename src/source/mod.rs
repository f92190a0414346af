//! WordPress source boundary.
//!
//! Everything the engine knows about WordPress goes through [`WpSource`]:
//! a read-only accessor that executes SELECT statements and returns typed
//! rows. Two accessors are provided, selected by configuration:
//! [`mysql::MysqlSource`] connects to the WordPress database directly, and
//! [`http::HttpSource`] posts queries to a site-side proxy endpoint.

pub mod http;
pub mod mysql;
pub mod row;

use async_trait::async_trait;

pub use row::{Row, SqlValue};

/// A failure while querying the WordPress source. Carries a human-readable
/// message only; row-level errors during a sync never surface through this
/// type, it covers the query itself.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SourceQueryError {
    pub message: String,
}

impl SourceQueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One column of a source table, as reported by `DESCRIBE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub field: String,
    /// Raw MySQL column type, e.g. `varchar(255)` or `tinyint(1)`
    pub column_type: String,
    pub nullable: bool,
    pub key: Option<String>,
}

impl ColumnInfo {
    /// Parse one `DESCRIBE` result row. MySQL reports Field, Type, Null, Key,
    /// Default, Extra; the proxy returns the same shape as json.
    pub fn from_row(row: &Row) -> Option<Self> {
        let field = row.get("Field")?.as_text()?;
        let column_type = row.get("Type")?.as_text().unwrap_or_default();
        let nullable = row
            .get("Null")
            .and_then(SqlValue::as_text)
            .map(|v| v.eq_ignore_ascii_case("yes"))
            .unwrap_or(true);
        let key = row.get("Key").and_then(SqlValue::as_text).filter(|k| !k.is_empty());
        Some(Self {
            field,
            column_type,
            nullable,
            key,
        })
    }
}

/// Read-only accessor for the WordPress database.
#[async_trait]
pub trait WpSource: Send + Sync {
    /// Execute a SELECT (or DESCRIBE) statement and return all result rows.
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, SourceQueryError>;

    /// Column metadata for a table. The default implementation issues a
    /// `DESCRIBE` through [`execute_query`](WpSource::execute_query).
    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SourceQueryError> {
        let rows = self.execute_query(&format!("DESCRIBE `{table}`")).await?;
        Ok(rows.iter().filter_map(ColumnInfo::from_row).collect())
    }
}
