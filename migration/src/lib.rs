//! Database migrations for the WP Sync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_07_01_000001_create_sync_settings;
mod m2025_07_01_000002_create_sync_tasks;
mod m2025_07_01_000003_create_sync_logs;
mod m2025_07_01_000004_create_documents;
mod m2025_07_01_000005_create_wp_table_data;
mod m2025_07_01_000006_create_doctype_fields;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_07_01_000001_create_sync_settings::Migration),
            Box::new(m2025_07_01_000002_create_sync_tasks::Migration),
            Box::new(m2025_07_01_000003_create_sync_logs::Migration),
            Box::new(m2025_07_01_000004_create_documents::Migration),
            Box::new(m2025_07_01_000005_create_wp_table_data::Migration),
            Box::new(m2025_07_01_000006_create_doctype_fields::Migration),
        ]
    }
}
