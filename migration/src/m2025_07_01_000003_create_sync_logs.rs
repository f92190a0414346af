//! Migration to create the sync_logs table.
//!
//! One row per task execution attempt, created in the Running state before
//! any engine work begins and completed exactly once with counters.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncLogs::TaskName).text().not_null())
                    .col(
                        ColumnDef::new(SyncLogs::Status)
                            .text()
                            .not_null()
                            .default("running"),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(SyncLogs::DurationSeconds).double().null())
                    .col(
                        ColumnDef::new(SyncLogs::RowsProcessed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RowsInserted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RowsUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RowsSkipped)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RowsFailed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncLogs::ErrorMessage).text().null())
                    .col(ColumnDef::new(SyncLogs::LogDetails).json_binary().null())
                    .to_owned(),
            )
            .await?;

        // Index for the status endpoint's "recent logs" view.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_logs_started_at")
                    .table(SyncLogs::Table)
                    .col(SyncLogs::StartedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_logs_task_started")
                    .table(SyncLogs::Table)
                    .col(SyncLogs::TaskName)
                    .col(SyncLogs::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_logs_started_at").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_sync_logs_task_started").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncLogs {
    Table,
    Id,
    TaskName,
    Status,
    StartedAt,
    CompletedAt,
    DurationSeconds,
    RowsProcessed,
    RowsInserted,
    RowsUpdated,
    RowsSkipped,
    RowsFailed,
    ErrorMessage,
    LogDetails,
}
