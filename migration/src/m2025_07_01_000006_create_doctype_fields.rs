//! Migration to create the doctype_fields table.
//!
//! Internal schema registry consulted by schema reconciliation. Rows are only
//! ever added here; reconciliation never removes or renames fields.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DoctypeFields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DoctypeFields::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DoctypeFields::Doctype).text().not_null())
                    .col(ColumnDef::new(DoctypeFields::Fieldname).text().not_null())
                    .col(ColumnDef::new(DoctypeFields::Label).text().not_null())
                    .col(ColumnDef::new(DoctypeFields::Fieldtype).text().not_null())
                    .col(ColumnDef::new(DoctypeFields::WpColumn).text().not_null())
                    .col(
                        ColumnDef::new(DoctypeFields::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_doctype_fields_doctype_fieldname")
                    .table(DoctypeFields::Table)
                    .col(DoctypeFields::Doctype)
                    .col(DoctypeFields::Fieldname)
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
                    .name("idx_doctype_fields_doctype_fieldname")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DoctypeFields::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DoctypeFields {
    Table,
    Id,
    Doctype,
    Fieldname,
    Label,
    Fieldtype,
    WpColumn,
    CreatedAt,
}
