//! SELECT statement construction for source fetches.
//!
//! Statements are assembled from task configuration, so identifiers are
//! validated before they are interpolated: a table or column name that is
//! not a plain SQL identifier fails the run instead of reaching WordPress.
//! The task's `where_clause` is operator-supplied and passed through as-is,
//! parenthesized.

use chrono::{Duration, FixedOffset};
use regex::Regex;
use sea_orm::prelude::DateTimeWithTimeZone;
use std::sync::LazyLock;

use crate::error::EngineError;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Validate and backtick-quote a table or column name.
pub fn quote_identifier(name: &str) -> Result<String, EngineError> {
    if IDENTIFIER.is_match(name) {
        Ok(format!("`{name}`"))
    } else {
        Err(EngineError::Validation(format!(
            "`{name}` is not a valid SQL identifier"
        )))
    }
}

/// Builder for the `SELECT * FROM ...` a sync run issues.
pub struct SelectBuilder {
    table: String,
    conditions: Vec<String>,
}

impl SelectBuilder {
    pub fn new(table: &str) -> Result<Self, EngineError> {
        Ok(Self {
            table: quote_identifier(table)?,
            conditions: Vec::new(),
        })
    }

    /// Append the task's raw filter, if configured.
    pub fn with_where_clause(mut self, clause: Option<&str>) -> Self {
        if let Some(clause) = clause {
            let trimmed = clause.trim();
            if !trimmed.is_empty() {
                self.conditions.push(format!("({trimmed})"));
            }
        }
        self
    }

    /// Append the incremental filter `column >= cutoff`.
    pub fn with_incremental(mut self, column: &str, cutoff: &str) -> Result<Self, EngineError> {
        let column = quote_identifier(column)?;
        self.conditions.push(format!("({column} >= '{cutoff}')"));
        Ok(self)
    }

    pub fn build(self) -> String {
        let mut sql = format!("SELECT * FROM {}", self.table);
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        sql
    }
}

/// Cutoff timestamp for an incremental fetch: the last run's start, shifted
/// into the source timezone, minus the overlap buffer. The buffer re-reads
/// rows modified while the previous run was in flight.
pub fn incremental_cutoff(
    last_run_at: DateTimeWithTimeZone,
    buffer_minutes: i32,
    source_offset: Option<&str>,
) -> String {
    let shifted = match source_offset.and_then(parse_offset) {
        Some(offset) => last_run_at.with_timezone(&offset),
        None => last_run_at,
    };
    (shifted - Duration::minutes(i64::from(buffer_minutes)))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Parse an offset of the form `+HH:MM` / `-HH:MM`.
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, rest) = match value.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let seconds = sign * (hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60);
    FixedOffset::east_opt(seconds)
}
