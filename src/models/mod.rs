//! # Data Models
//!
//! SeaORM entity models for the WP Sync service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod doctype_field;
pub mod document;
pub mod sync_log;
pub mod sync_settings;
pub mod sync_task;
pub mod wp_table_data;

pub use doctype_field::Entity as DoctypeField;
pub use document::Entity as Document;
pub use sync_log::Entity as SyncLog;
pub use sync_settings::Entity as SyncSettings;
pub use sync_task::Entity as SyncTask;
pub use wp_table_data::Entity as WpTableData;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "wp-sync".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
