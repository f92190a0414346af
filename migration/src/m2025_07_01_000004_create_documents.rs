//! Migration to create the documents table.
//!
//! Schema-backed target records. The pair (doctype, wp_source_id) uniquely
//! identifies at most one document, so re-syncing the same WordPress row
//! updates rather than duplicates.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Documents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Documents::Doctype).text().not_null())
                    .col(ColumnDef::new(Documents::WpSourceTable).text().not_null())
                    .col(ColumnDef::new(Documents::WpSourceId).text().not_null())
                    .col(
                        ColumnDef::new(Documents::WpSyncedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Documents::Fields)
                            .json_binary()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_documents_doctype_source_id")
                    .table(Documents::Table)
                    .col(Documents::Doctype)
                    .col(Documents::WpSourceId)
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
                    .name("idx_documents_doctype_source_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Documents {
    Table,
    Id,
    Doctype,
    WpSourceTable,
    WpSourceId,
    WpSyncedAt,
    Fields,
}
