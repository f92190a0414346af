//! Migration to create the sync_settings table.
//!
//! A single-row table holding the global sync switch and the timestamp of the
//! last completed scheduled run.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncSettings::Id)
                            .small_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SyncSettings::SyncEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SyncSettings::LastSyncAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncSettings {
    Table,
    Id,
    SyncEnabled,
    LastSyncAt,
}
