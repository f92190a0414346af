//! # SyncTask Repository
//!
//! Repository operations for the sync_tasks table: the task catalogue the
//! scheduler reads and the API manages.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::engine::mapping::FieldMapping;
use crate::error::ApiError;
use crate::models::sync_task::{ActiveModel, Column, Entity, Model, SyncDirection};

/// Parameters for creating a sync task.
#[derive(Debug, Clone)]
pub struct NewSyncTask {
    pub name: String,
    pub source_table: String,
    pub target_doctype: String,
    pub field_mapping: Option<JsonValue>,
    pub sync_direction: SyncDirection,
    pub where_clause: Option<String>,
    pub use_incremental_sync: bool,
    pub updated_at_field: Option<String>,
    pub updated_at_timezone: Option<String>,
    pub sync_buffer_minutes: i32,
    pub enabled: bool,
    pub execution_order: i32,
}

/// Repository for sync task database operations
pub struct SyncTaskRepository {
    db: DatabaseConnection,
}

impl SyncTaskRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Enabled tasks in execution order; ties break on name so batch order
    /// is stable.
    pub async fn list_enabled(&self) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Enabled.eq(true))
            .order_by_asc(Column::ExecutionOrder)
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await
    }

    pub async fn list_all(&self) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .order_by_asc(Column::ExecutionOrder)
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await
    }

    pub async fn count_all(&self) -> Result<u64, DbErr> {
        Entity::find().count(&self.db).await
    }

    pub async fn count_enabled(&self) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::Enabled.eq(true))
            .count(&self.db)
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::Name.eq(name))
            .one(&self.db)
            .await
    }

    /// Create a task. The mapping is validated here so a malformed one is
    /// rejected at save time rather than on its first run.
    pub async fn create(&self, params: NewSyncTask) -> Result<Model, ApiError> {
        FieldMapping::parse(params.field_mapping.as_ref()).map_err(ApiError::from)?;

        if params.name.trim().is_empty() {
            return Err(crate::error::validation_error(
                "Task name must not be empty",
                serde_json::json!({"name": "required"}),
            ));
        }

        let now = Utc::now().fixed_offset();
        let task = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(params.name),
            source_table: Set(params.source_table),
            target_doctype: Set(params.target_doctype),
            field_mapping: Set(params.field_mapping),
            sync_direction: Set(params.sync_direction.as_str().to_string()),
            where_clause: Set(params.where_clause),
            use_incremental_sync: Set(params.use_incremental_sync),
            updated_at_field: Set(params.updated_at_field),
            updated_at_timezone: Set(params.updated_at_timezone),
            sync_buffer_minutes: Set(params.sync_buffer_minutes),
            enabled: Set(params.enabled),
            execution_order: Set(params.execution_order),
            last_run_at: Set(None),
            last_run_status: Set(None),
            rows_synced: Set(0),
            last_error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = task.insert(&self.db).await.map_err(|e| {
            tracing::error!("Failed to create sync task: {}", e);
            ApiError::from(e)
        })?;

        tracing::info!(
            task = %result.name,
            source_table = %result.source_table,
            target_doctype = %result.target_doctype,
            "Sync task created"
        );

        Ok(result)
    }

    /// Stamp the task with the outcome of its latest run. The error text is
    /// truncated to fit the column.
    pub async fn update_status(
        &self,
        task: Model,
        status: &str,
        rows_synced: i32,
        error: Option<&str>,
    ) -> Result<Model, DbErr> {
        const MAX_ERROR_LEN: usize = 500;

        let now = Utc::now().fixed_offset();
        let mut active: ActiveModel = task.into();
        active.last_run_at = Set(Some(now));
        active.last_run_status = Set(Some(status.to_string()));
        active.rows_synced = Set(rows_synced);
        active.last_error = Set(error.map(|e| e.chars().take(MAX_ERROR_LEN).collect()));
        active.updated_at = Set(now);
        active.update(&self.db).await
    }
}
