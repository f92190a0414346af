//! Migration to create the sync_tasks table.
//!
//! Each row configures one synchronization unit: the WordPress source table,
//! the target doctype, the column-to-field mapping, filters, incremental sync
//! parameters and the task's mutable run state.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncTasks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SyncTasks::Name)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SyncTasks::SourceTable).text().not_null())
                    .col(ColumnDef::new(SyncTasks::TargetDoctype).text().not_null())
                    .col(ColumnDef::new(SyncTasks::FieldMapping).json_binary().null())
                    .col(
                        ColumnDef::new(SyncTasks::SyncDirection)
                            .text()
                            .not_null()
                            .default("wp_to_app"),
                    )
                    .col(ColumnDef::new(SyncTasks::WhereClause).text().null())
                    .col(
                        ColumnDef::new(SyncTasks::UseIncrementalSync)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SyncTasks::UpdatedAtField).text().null())
                    .col(ColumnDef::new(SyncTasks::UpdatedAtTimezone).text().null())
                    .col(
                        ColumnDef::new(SyncTasks::SyncBufferMinutes)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(SyncTasks::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SyncTasks::ExecutionOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncTasks::LastRunAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(SyncTasks::LastRunStatus).text().null())
                    .col(
                        ColumnDef::new(SyncTasks::RowsSynced)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncTasks::LastError).text().null())
                    .col(
                        ColumnDef::new(SyncTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index used by the orchestrator to load enabled tasks in run order.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_tasks_enabled_order")
                    .table(SyncTasks::Table)
                    .col(SyncTasks::Enabled)
                    .col(SyncTasks::ExecutionOrder)
                    .col(SyncTasks::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_tasks_enabled_order").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncTasks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncTasks {
    Table,
    Id,
    Name,
    SourceTable,
    TargetDoctype,
    FieldMapping,
    SyncDirection,
    WhereClause,
    UseIncrementalSync,
    UpdatedAtField,
    UpdatedAtTimezone,
    SyncBufferMinutes,
    Enabled,
    ExecutionOrder,
    LastRunAt,
    LastRunStatus,
    RowsSynced,
    LastError,
    CreatedAt,
    UpdatedAt,
}
