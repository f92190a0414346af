//! Migration to create the wp_table_data table.
//!
//! Generic storage for rows synced from any WordPress table without a
//! dedicated doctype: the whole source row lands in a single json column.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WpTableData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WpTableData::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WpTableData::TableName).text().not_null())
                    .col(ColumnDef::new(WpTableData::RecordId).text().not_null())
                    .col(ColumnDef::new(WpTableData::Data).json_binary().not_null())
                    .col(
                        ColumnDef::new(WpTableData::SyncedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wp_table_data_table_record")
                    .table(WpTableData::Table)
                    .col(WpTableData::TableName)
                    .col(WpTableData::RecordId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_wp_table_data_table_record")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(WpTableData::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WpTableData {
    Table,
    Id,
    TableName,
    RecordId,
    Data,
    SyncedAt,
}
