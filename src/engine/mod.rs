//! Sync engine.
//!
//! Pulls rows out of WordPress and upserts them into the document store,
//! one task at a time. A task run is: open a log row, fetch, map, write all
//! rows in one transaction, close the log, stamp the task. Row-level
//! failures are isolated: a bad row is counted and the batch keeps going;
//! only task-level failures (source unreachable, bad configuration) fail
//! the run.

pub mod mapping;
pub mod query;

use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::sync_log;
use crate::models::sync_task::{Model as SyncTask, SyncDirection};
use crate::repositories::{LogCompletion, SettingsRepository, SyncLogRepository, SyncTaskRepository};
use crate::source::{ColumnInfo, Row, WpSource};
use crate::store::{
    DbDocumentStore, DbSchemaRegistry, DocumentStore, FieldSpec, SchemaRegistry, SyncTarget,
    map_mysql_type,
};
use mapping::{FieldMapping, IDENTITY_FIELD_DOCTYPE, IDENTITY_FIELD_GENERIC, resolve_identity};
use query::{SelectBuilder, incremental_cutoff};

/// How many per-row errors are kept on the log row.
const MAX_ROW_ERRORS: usize = 20;

/// Row counters for one run. `skipped` rows were never attempted (no usable
/// identity); `failed` rows errored during the write. Reported skipped
/// totals fold the failed rows in, so `fetched == synced + skipped_total`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunCounts {
    pub fetched: i32,
    pub inserted: i32,
    pub updated: i32,
    pub skipped: i32,
    pub failed: i32,
}

impl RunCounts {
    pub fn synced(&self) -> i32 {
        self.inserted + self.updated
    }

    /// Every row that did not land, whether never attempted or errored.
    pub fn skipped_total(&self) -> i32 {
        self.skipped + self.failed
    }
}

/// Outcome of one task run, as reported to callers and the API.
#[derive(Debug, Clone)]
pub struct TaskRunResult {
    pub task_name: String,
    pub status: String,
    pub counts: RunCounts,
    pub error: Option<String>,
    pub log_id: Option<Uuid>,
}

impl TaskRunResult {
    fn failed_without_log(task_name: &str, error: &EngineError) -> Self {
        Self {
            task_name: task_name.to_string(),
            status: sync_log::STATUS_FAILED.to_string(),
            counts: RunCounts::default(),
            error: Some(error.to_string()),
            log_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == sync_log::STATUS_SUCCESS
    }
}

/// Outcome of a scheduled or batch run over several tasks.
#[derive(Debug, Clone, Default)]
pub struct BatchRunResult {
    pub results: Vec<TaskRunResult>,
}

impl BatchRunResult {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Removes the task from the running set when the run ends, on every path.
struct TaskRunGuard {
    name: String,
    running: Arc<Mutex<HashSet<String>>>,
}

impl Drop for TaskRunGuard {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.name);
    }
}

pub struct SyncEngine {
    db: DatabaseConnection,
    source: Arc<dyn WpSource>,
    running: Arc<Mutex<HashSet<String>>>,
}

impl SyncEngine {
    pub fn new(db: DatabaseConnection, source: Arc<dyn WpSource>) -> Self {
        Self {
            db,
            source,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn tasks(&self) -> SyncTaskRepository {
        SyncTaskRepository::new(self.db.clone())
    }

    fn logs(&self) -> SyncLogRepository {
        SyncLogRepository::new(self.db.clone())
    }

    /// Run every enabled task in execution order. A failing task is recorded
    /// and the batch moves on; the global last-sync stamp is written even if
    /// some tasks failed.
    pub async fn run_scheduled_sync(&self) -> Result<BatchRunResult, EngineError> {
        let settings = SettingsRepository::new(self.db.clone()).load_or_init().await?;
        if !settings.sync_enabled {
            info!("Sync is disabled globally, skipping scheduled run");
            return Ok(BatchRunResult::default());
        }

        let tasks = self.tasks().list_enabled().await?;
        if tasks.is_empty() {
            info!("No enabled sync tasks, nothing to run");
            return Ok(BatchRunResult::default());
        }
        info!(tasks = tasks.len(), "Starting scheduled sync");

        let mut batch = BatchRunResult::default();
        for task in tasks {
            batch.results.push(self.run_task(task).await);
        }

        SettingsRepository::new(self.db.clone())
            .set_last_sync_now()
            .await?;

        info!(
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            "Scheduled sync finished"
        );
        Ok(batch)
    }

    /// Run one task by name, regardless of the global enable switch.
    pub async fn run_single_task(&self, name: &str) -> Result<TaskRunResult, EngineError> {
        let task = self
            .tasks()
            .find_by_name(name)
            .await?
            .ok_or_else(|| EngineError::TaskNotFound(name.to_string()))?;
        if !task.enabled {
            return Err(EngineError::TaskDisabled(name.to_string()));
        }
        Ok(self.run_task(task).await)
    }

    /// Run a caller-picked set of tasks, in the order given. Unknown or
    /// disabled names produce a failed result rather than aborting the rest.
    pub async fn run_multiple_tasks(&self, names: &[String]) -> Result<BatchRunResult, EngineError> {
        let mut batch = BatchRunResult::default();
        for name in names {
            match self.run_single_task(name).await {
                Ok(result) => batch.results.push(result),
                Err(err @ (EngineError::TaskNotFound(_) | EngineError::TaskDisabled(_))) => {
                    batch.results.push(TaskRunResult::failed_without_log(name, &err));
                }
                Err(other) => return Err(other),
            }
        }
        Ok(batch)
    }

    fn try_lock_task(&self, name: &str) -> Option<TaskRunGuard> {
        let mut running = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if running.insert(name.to_string()) {
            Some(TaskRunGuard {
                name: name.to_string(),
                running: Arc::clone(&self.running),
            })
        } else {
            None
        }
    }

    /// Run one task end to end: log open, sync, log close, task stamp.
    async fn run_task(&self, task: SyncTask) -> TaskRunResult {
        let task_name = task.name.clone();

        let Some(_guard) = self.try_lock_task(&task_name) else {
            warn!(task = %task_name, "Task is already running, refusing overlapping run");
            return TaskRunResult::failed_without_log(
                &task_name,
                &EngineError::AlreadyRunning(task_name.clone()),
            );
        };

        let log = match self.logs().start(&task_name).await {
            Ok(log) => log,
            Err(err) => {
                error!(task = %task_name, error = %err, "Failed to open sync log");
                return TaskRunResult::failed_without_log(&task_name, &EngineError::Db(err));
            }
        };
        let log_id = log.id;

        let started = Instant::now();
        let outcome = match task.direction() {
            SyncDirection::WpToApp => self.sync_wp_to_app(&task).await,
            other => Err(EngineError::DirectionNotImplemented(
                other.as_str().to_string(),
            )),
        };
        let elapsed = started.elapsed().as_secs_f64();

        let (success, counts, error, details) = match outcome {
            Ok((counts, details)) => (true, counts, None, details),
            Err(err) => {
                error!(task = %task_name, error = %err, "Sync task failed");
                (false, RunCounts::default(), Some(err.to_string()), None)
            }
        };

        let status_label = if success { "success" } else { "failed" };
        counter!("wp_sync_task_runs_total", "status" => status_label).increment(1);
        counter!("wp_sync_rows_synced_total").increment(counts.synced().max(0) as u64);
        histogram!("wp_sync_task_duration_seconds").record(elapsed);

        let completion = LogCompletion {
            success,
            rows_processed: counts.fetched,
            rows_inserted: counts.inserted,
            rows_updated: counts.updated,
            rows_skipped: counts.skipped_total(),
            rows_failed: counts.failed,
            error_message: error.clone(),
            details,
        };
        if let Err(err) = self.logs().complete(log, completion).await {
            error!(task = %task_name, error = %err, "Failed to close sync log");
        }

        if let Err(err) = self
            .tasks()
            .update_status(task, status_label, counts.synced(), error.as_deref())
            .await
        {
            error!(task = %task_name, error = %err, "Failed to stamp task status");
        }

        info!(
            task = %task_name,
            status = status_label,
            fetched = counts.fetched,
            inserted = counts.inserted,
            updated = counts.updated,
            skipped = counts.skipped_total(),
            failed = counts.failed,
            duration_seconds = elapsed,
            "Sync task finished"
        );

        TaskRunResult {
            task_name,
            status: status_label.to_string(),
            counts,
            error,
            log_id: Some(log_id),
        }
    }

    /// WordPress → document store for one task. Returns the counters and an
    /// optional details object with per-row error summaries.
    async fn sync_wp_to_app(
        &self,
        task: &SyncTask,
    ) -> Result<(RunCounts, Option<JsonValue>), EngineError> {
        let generic = task.is_generic_target();
        let mut mapping = FieldMapping::parse(task.field_mapping.as_ref())?;

        // A configured mapping names its columns up front, so the target
        // schema reconciles before any data is read. Auto-derived mappings
        // only exist once a first row has been seen, so their reconciliation
        // waits for the fetch.
        if !generic && !mapping.is_empty() {
            self.reconcile_schema(task, &mapping).await?;
        }

        let sql = self.build_select(task)?;
        info!(task = %task.name, sql = %sql, "Fetching source rows");

        let rows = self.source.execute_query(&sql).await?;
        let fetched = rows.len() as i32;
        if rows.is_empty() {
            return Ok((
                RunCounts {
                    fetched,
                    ..RunCounts::default()
                },
                None,
            ));
        }

        if mapping.is_empty() {
            mapping = FieldMapping::auto_map(&rows[0]);
            info!(task = %task.name, "No field mapping configured, derived one from source columns");
            if !generic {
                self.reconcile_schema(task, &mapping).await?;
            }
        }

        let target = if generic {
            SyncTarget::Generic {
                source_table: task.source_table.clone(),
            }
        } else {
            SyncTarget::Doctype {
                doctype: task.target_doctype.clone(),
                source_table: task.source_table.clone(),
            }
        };

        let identity_column = resolve_identity(&mapping, &rows[0], generic)
            .ok_or_else(|| EngineError::Validation("source rows have no columns".to_string()))?;
        let identity_field = if generic {
            IDENTITY_FIELD_GENERIC
        } else {
            IDENTITY_FIELD_DOCTYPE
        };

        let txn = self.db.begin().await?;
        let store = DbDocumentStore::new(&txn);
        let (row_counts, row_errors) = apply_rows(
            &store,
            &target,
            &rows,
            &mapping,
            &identity_column,
            identity_field,
            generic,
        )
        .await;
        txn.commit().await?;

        let counts = RunCounts {
            fetched,
            ..row_counts
        };
        let details = if row_errors.is_empty() {
            None
        } else {
            Some(json!({
                "identity_column": identity_column,
                "row_errors": row_errors,
            }))
        };
        Ok((counts, details))
    }

    /// Additive reconciliation of the target doctype's fields against the
    /// mapping. Runs on its own connection so new fields survive even when
    /// the fetch afterwards fails or matches nothing.
    async fn reconcile_schema(
        &self,
        task: &SyncTask,
        mapping: &FieldMapping,
    ) -> Result<(), EngineError> {
        let columns = match self.source.describe_columns(&task.source_table).await {
            Ok(columns) => columns,
            Err(err) => {
                // Reconciliation still works without introspection, new
                // fields just default to Data.
                warn!(task = %task.name, error = %err, "Could not introspect source table");
                Vec::new()
            }
        };
        let desired = desired_fields(mapping, &columns, IDENTITY_FIELD_DOCTYPE);
        DbSchemaRegistry::new(&self.db)
            .ensure_fields(&task.target_doctype, &desired)
            .await?;
        Ok(())
    }

    fn build_select(&self, task: &SyncTask) -> Result<String, EngineError> {
        let mut builder =
            SelectBuilder::new(&task.source_table)?.with_where_clause(task.where_clause.as_deref());

        // The incremental filter only applies from the second run on; a task
        // that has never run fetches everything.
        if task.use_incremental_sync
            && let (Some(field), Some(last_run_at)) =
                (task.updated_at_field.as_deref(), task.last_run_at)
        {
            let cutoff = incremental_cutoff(
                last_run_at,
                task.sync_buffer_minutes,
                task.updated_at_timezone.as_deref(),
            );
            builder = builder.with_incremental(field, &cutoff)?;
        }

        Ok(builder.build())
    }
}

enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Map and write one batch of rows, isolating per-row failures: a row
/// without a usable identity is skipped, a row whose write errors is counted
/// and summarized, and the loop always reaches the end of the batch. Returns
/// the row counters (`fetched` is left to the caller) and the collected
/// per-row error summaries.
async fn apply_rows(
    store: &dyn DocumentStore,
    target: &SyncTarget,
    rows: &[Row],
    mapping: &FieldMapping,
    identity_column: &str,
    identity_field: &str,
    generic: bool,
) -> (RunCounts, Vec<JsonValue>) {
    let mut counts = RunCounts::default();
    let mut row_errors: Vec<JsonValue> = Vec::new();

    for row in rows {
        let Some(source_id) = row.get(identity_column).and_then(|v| v.as_id_string()) else {
            counts.skipped += 1;
            push_row_error(&mut row_errors, None, "missing or empty identity value");
            continue;
        };

        let result = upsert_row(
            store,
            target,
            &source_id,
            row,
            mapping,
            identity_field,
            generic,
        )
        .await;

        match result {
            Ok(UpsertOutcome::Inserted) => counts.inserted += 1,
            Ok(UpsertOutcome::Updated) => counts.updated += 1,
            Err(err) => {
                warn!(
                    table = %target.source_table(),
                    source_id = %source_id,
                    error = %err,
                    "Row sync failed, continuing with the rest of the batch"
                );
                counts.failed += 1;
                push_row_error(&mut row_errors, Some(&source_id), &err.to_string());
            }
        }
    }

    (counts, row_errors)
}

/// Insert or update one row. Updates never carry the identity field and drop
/// null values, so an update cannot blank out stored data or move a record
/// to a different source identity.
async fn upsert_row(
    store: &dyn DocumentStore,
    target: &SyncTarget,
    source_id: &str,
    row: &Row,
    mapping: &FieldMapping,
    identity_field: &str,
    generic: bool,
) -> Result<UpsertOutcome, EngineError> {
    let exists = store.exists(target, source_id).await?;

    let fields = if generic {
        match row.to_json() {
            JsonValue::Object(object) => object,
            _ => Map::new(),
        }
    } else {
        mapped_fields(row, mapping, identity_field, !exists)
    };

    if exists {
        store.save(target, source_id, fields).await?;
        Ok(UpsertOutcome::Updated)
    } else {
        store.insert(target, source_id, fields).await?;
        Ok(UpsertOutcome::Inserted)
    }
}

/// Project a source row through the mapping. Inserts keep nulls so every
/// mapped field exists on the stored record; updates drop them.
fn mapped_fields(
    row: &Row,
    mapping: &FieldMapping,
    identity_field: &str,
    include_nulls: bool,
) -> Map<String, JsonValue> {
    let mut fields = Map::new();
    for (column, target_field) in mapping.iter() {
        if target_field == identity_field {
            continue;
        }
        let Some(value) = row.get(column) else {
            continue;
        };
        if value.is_null() && !include_nulls {
            continue;
        }
        fields.insert(target_field.to_string(), value.to_json());
    }
    fields
}

/// Field rows a doctype needs for this mapping, typed from introspection
/// where available.
fn desired_fields(
    mapping: &FieldMapping,
    columns: &[ColumnInfo],
    identity_field: &str,
) -> Vec<FieldSpec> {
    mapping
        .iter()
        .filter(|(_, target)| *target != identity_field)
        .map(|(column, target)| {
            let fieldtype = columns
                .iter()
                .find(|info| info.field == column)
                .map(|info| map_mysql_type(&info.column_type))
                .unwrap_or("Data");
            FieldSpec {
                fieldname: target.to_string(),
                label: mapping::label_from_column(column),
                fieldtype,
                wp_column: column.to_string(),
            }
        })
        .collect()
}

fn push_row_error(errors: &mut Vec<JsonValue>, source_id: Option<&str>, message: &str) {
    if errors.len() >= MAX_ROW_ERRORS {
        return;
    }
    errors.push(json!({
        "source_id": source_id,
        "error": message,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sync_task::GENERIC_TARGET_DOCTYPE;
    use crate::repositories::NewSyncTask;
    use crate::source::{SourceQueryError, SqlValue};
    use crate::store::StoreError;
    use async_trait::async_trait;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, EntityTrait};
    use serde_json::json;

    struct ScriptedSource {
        rows: Vec<Row>,
        describe: Vec<Row>,
        fail: bool,
    }

    #[async_trait]
    impl WpSource for ScriptedSource {
        async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, SourceQueryError> {
            if self.fail {
                return Err(SourceQueryError::new("connection refused"));
            }
            if sql.starts_with("DESCRIBE") {
                return Ok(self.describe.clone());
            }
            Ok(self.rows.clone())
        }
    }

    fn post_row(id: i64, title: &str) -> Row {
        let mut row = Row::new();
        row.push("ID", SqlValue::Integer(id));
        row.push("post_title", SqlValue::Text(title.into()));
        row.push("post_excerpt", SqlValue::Null);
        row
    }

    fn describe_row(field: &str, column_type: &str) -> Row {
        let mut row = Row::new();
        row.push("Field", SqlValue::Text(field.into()));
        row.push("Type", SqlValue::Text(column_type.into()));
        row.push("Null", SqlValue::Text("YES".into()));
        row.push("Key", SqlValue::Text("".into()));
        row
    }

    async fn engine_with(rows: Vec<Row>, fail: bool) -> SyncEngine {
        engine_with_describe(rows, Vec::new(), fail).await
    }

    async fn engine_with_describe(rows: Vec<Row>, describe: Vec<Row>, fail: bool) -> SyncEngine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SyncEngine::new(db, Arc::new(ScriptedSource { rows, describe, fail }))
    }

    fn task_params(name: &str, doctype: &str) -> NewSyncTask {
        NewSyncTask {
            name: name.into(),
            source_table: "wp_posts".into(),
            target_doctype: doctype.into(),
            field_mapping: Some(json!({
                "ID": "wp_source_id",
                "post_title": "title",
                "post_excerpt": "excerpt",
            })),
            sync_direction: SyncDirection::WpToApp,
            where_clause: None,
            use_incremental_sync: false,
            updated_at_field: None,
            updated_at_timezone: None,
            sync_buffer_minutes: 3,
            enabled: true,
            execution_order: 0,
        }
    }

    #[tokio::test]
    async fn first_run_inserts_and_second_updates() {
        let engine = engine_with(vec![post_row(1, "Hi")], false).await;
        SyncTaskRepository::new(engine.db.clone())
            .create(task_params("posts", "WP Post"))
            .await
            .unwrap();

        let result = engine.run_single_task("posts").await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.counts.inserted, 1);
        assert_eq!(result.counts.updated, 0);

        let result = engine.run_single_task("posts").await.unwrap();
        assert_eq!(result.counts.inserted, 0);
        assert_eq!(result.counts.updated, 1);

        let store = DbDocumentStore::new(&engine.db);
        let target = SyncTarget::Doctype {
            doctype: "WP Post".into(),
            source_table: "wp_posts".into(),
        };
        let stored = store.get(&target, "1").await.unwrap().unwrap();
        assert_eq!(stored.get("title"), Some(&json!("Hi")));
        // Insert kept the null, and the second run's null-drop left it alone.
        assert_eq!(stored.get("excerpt"), Some(&json!(null)));
    }

    #[tokio::test]
    async fn rows_without_identity_are_skipped_not_fatal() {
        let mut no_id = Row::new();
        no_id.push("ID", SqlValue::Null);
        no_id.push("post_title", SqlValue::Text("orphan".into()));

        let engine = engine_with(vec![post_row(1, "ok"), no_id], false).await;
        SyncTaskRepository::new(engine.db.clone())
            .create(task_params("posts", "WP Post"))
            .await
            .unwrap();

        let result = engine.run_single_task("posts").await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.counts.fetched, 2);
        assert_eq!(result.counts.inserted, 1);
        assert_eq!(result.counts.skipped, 1);

        let log = sync_log::Entity::find()
            .one(&engine.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.status, sync_log::STATUS_SUCCESS);
        assert_eq!(log.rows_skipped, 1);
        assert!(log.log_details.is_some());
    }

    #[tokio::test]
    async fn source_failure_fails_the_run_and_log() {
        let engine = engine_with(Vec::new(), true).await;
        SyncTaskRepository::new(engine.db.clone())
            .create(task_params("posts", "WP Post"))
            .await
            .unwrap();

        let result = engine.run_single_task("posts").await.unwrap();
        assert!(!result.is_success());
        assert!(result.error.as_deref().unwrap().contains("connection refused"));

        let log = sync_log::Entity::find()
            .one(&engine.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.status, sync_log::STATUS_FAILED);
        assert!(log.completed_at.is_some());

        let task = SyncTaskRepository::new(engine.db.clone())
            .find_by_name("posts")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.last_run_status.as_deref(), Some("failed"));
        assert!(task.last_error.is_some());
    }

    /// Store that rejects the write for one configured identity, standing in
    /// for a row that violates a target constraint.
    struct RejectingStore {
        reject_id: String,
    }

    #[async_trait]
    impl DocumentStore for RejectingStore {
        async fn exists(&self, _target: &SyncTarget, _source_id: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn get(
            &self,
            _target: &SyncTarget,
            _source_id: &str,
        ) -> Result<Option<JsonValue>, StoreError> {
            Ok(None)
        }

        async fn insert(
            &self,
            _target: &SyncTarget,
            source_id: &str,
            _fields: Map<String, JsonValue>,
        ) -> Result<(), StoreError> {
            if source_id == self.reject_id {
                return Err(StoreError::Db(sea_orm::DbErr::Custom(
                    "CHECK constraint failed: fields".into(),
                )));
            }
            Ok(())
        }

        async fn save(
            &self,
            _target: &SyncTarget,
            _source_id: &str,
            _fields: Map<String, JsonValue>,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_writes_count_as_skipped_without_aborting_the_batch() {
        let mapping = FieldMapping::parse(Some(&json!({
            "ID": "wp_source_id",
            "post_title": "title",
        })))
        .unwrap();
        let target = SyncTarget::Doctype {
            doctype: "WP Post".into(),
            source_table: "wp_posts".into(),
        };
        let rows = vec![post_row(1, "a"), post_row(2, "b"), post_row(3, "c")];
        let store = RejectingStore {
            reject_id: "2".into(),
        };

        let (counts, errors) = apply_rows(
            &store,
            &target,
            &rows,
            &mapping,
            "ID",
            IDENTITY_FIELD_DOCTYPE,
            false,
        )
        .await;

        // The bad row is absorbed: the other two land and the reported
        // skipped total covers the failure.
        assert_eq!(counts.inserted, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.skipped, 0);
        assert_eq!(counts.skipped_total(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["source_id"], "2");
    }

    #[tokio::test]
    async fn generic_target_stores_full_row() {
        let engine = engine_with(vec![post_row(7, "raw")], false).await;
        let mut params = task_params("raw-posts", GENERIC_TARGET_DOCTYPE);
        params.field_mapping = None;
        SyncTaskRepository::new(engine.db.clone())
            .create(params)
            .await
            .unwrap();

        let result = engine.run_single_task("raw-posts").await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.counts.inserted, 1);

        let store = DbDocumentStore::new(&engine.db);
        let target = SyncTarget::Generic {
            source_table: "wp_posts".into(),
        };
        let stored = store.get(&target, "7").await.unwrap().unwrap();
        assert_eq!(
            stored,
            json!({"ID": 7, "post_title": "raw", "post_excerpt": null})
        );
    }

    #[tokio::test]
    async fn unknown_direction_fails_cleanly() {
        let engine = engine_with(vec![post_row(1, "Hi")], false).await;
        let mut params = task_params("push", "WP Post");
        params.sync_direction = SyncDirection::AppToWp;
        SyncTaskRepository::new(engine.db.clone())
            .create(params)
            .await
            .unwrap();

        let result = engine.run_single_task("push").await.unwrap();
        assert!(!result.is_success());
        assert!(result.error.as_deref().unwrap().contains("app_to_wp"));
    }

    #[tokio::test]
    async fn disabled_tasks_are_refused() {
        let engine = engine_with(vec![post_row(1, "Hi")], false).await;
        let mut params = task_params("off", "WP Post");
        params.enabled = false;
        SyncTaskRepository::new(engine.db.clone())
            .create(params)
            .await
            .unwrap();

        let err = engine.run_single_task("off").await.unwrap_err();
        assert!(matches!(err, EngineError::TaskDisabled(_)));
    }

    #[tokio::test]
    async fn scheduled_sync_continues_past_failures_and_stamps_settings() {
        let engine = engine_with(vec![post_row(1, "Hi")], false).await;
        let repo = SyncTaskRepository::new(engine.db.clone());

        let mut bad = task_params("a-bad", "WP Post");
        bad.source_table = "wp_posts; DROP TABLE x".into();
        bad.execution_order = 0;
        repo.create(bad).await.unwrap();

        let mut good = task_params("b-good", "WP Post");
        good.execution_order = 1;
        repo.create(good).await.unwrap();

        let batch = engine.run_scheduled_sync().await.unwrap();
        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.failed(), 1);
        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.results[0].task_name, "a-bad");
        assert_eq!(batch.results[1].task_name, "b-good");

        let settings = SettingsRepository::new(engine.db.clone())
            .load_or_init()
            .await
            .unwrap();
        assert!(settings.last_sync_at.is_some());
    }

    #[tokio::test]
    async fn scheduled_sync_with_no_enabled_tasks_does_not_stamp_settings() {
        let engine = engine_with(Vec::new(), false).await;

        let batch = engine.run_scheduled_sync().await.unwrap();
        assert!(batch.results.is_empty());

        let settings = SettingsRepository::new(engine.db.clone())
            .load_or_init()
            .await
            .unwrap();
        assert!(settings.last_sync_at.is_none());
    }

    #[tokio::test]
    async fn schema_reconciles_before_any_rows_arrive() {
        let describe = vec![
            describe_row("ID", "bigint(20)"),
            describe_row("post_title", "varchar(255)"),
            describe_row("post_excerpt", "text"),
        ];
        let engine = engine_with_describe(Vec::new(), describe, false).await;
        SyncTaskRepository::new(engine.db.clone())
            .create(task_params("posts", "WP Post"))
            .await
            .unwrap();

        let result = engine.run_single_task("posts").await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.counts.fetched, 0);

        // The mapped fields exist even though the fetch matched nothing.
        let fields = crate::models::doctype_field::Entity::find()
            .all(&engine.db)
            .await
            .unwrap();
        let mut names: Vec<_> = fields.iter().map(|f| f.fieldname.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["excerpt", "title"]);
        let excerpt = fields.iter().find(|f| f.fieldname == "excerpt").unwrap();
        assert_eq!(excerpt.fieldtype, "Text");
    }

    #[tokio::test]
    async fn scheduled_sync_is_a_no_op_when_disabled() {
        let engine = engine_with(vec![post_row(1, "Hi")], false).await;
        let settings_repo = SettingsRepository::new(engine.db.clone());
        let settings = settings_repo.load_or_init().await.unwrap();
        let mut active: crate::models::sync_settings::ActiveModel = settings.into();
        active.sync_enabled = sea_orm::Set(false);
        sea_orm::ActiveModelTrait::update(active, &engine.db)
            .await
            .unwrap();

        let batch = engine.run_scheduled_sync().await.unwrap();
        assert!(batch.results.is_empty());
    }

    #[tokio::test]
    async fn run_multiple_reports_unknown_names() {
        let engine = engine_with(vec![post_row(1, "Hi")], false).await;
        SyncTaskRepository::new(engine.db.clone())
            .create(task_params("posts", "WP Post"))
            .await
            .unwrap();

        let batch = engine
            .run_multiple_tasks(&["posts".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.results.len(), 2);
        assert!(batch.results[0].is_success());
        assert!(!batch.results[1].is_success());
        assert!(batch.results[1].error.as_deref().unwrap().contains("missing"));
    }

    #[test]
    fn update_drops_nulls_but_insert_keeps_them() {
        let mapping = FieldMapping::parse(Some(&json!({
            "ID": "wp_source_id",
            "post_title": "title",
            "post_excerpt": "excerpt",
        })))
        .unwrap();
        let row = post_row(1, "Hi");

        let insert = mapped_fields(&row, &mapping, IDENTITY_FIELD_DOCTYPE, true);
        assert_eq!(insert.get("excerpt"), Some(&json!(null)));
        assert!(!insert.contains_key("wp_source_id"));

        let update = mapped_fields(&row, &mapping, IDENTITY_FIELD_DOCTYPE, false);
        assert!(!update.contains_key("excerpt"));
        assert_eq!(update.get("title"), Some(&json!("Hi")));
    }
}
