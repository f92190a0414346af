//! # Settings Repository
//!
//! Access to the singleton sync_settings row: the global enable switch and
//! the last scheduled run stamp.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};

use crate::models::sync_settings::{ActiveModel, Entity, Model, SETTINGS_ROW_ID};

/// Repository for the global sync settings row
pub struct SettingsRepository {
    db: DatabaseConnection,
}

impl SettingsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetch the settings row, creating it with defaults on first access.
    pub async fn load_or_init(&self) -> Result<Model, DbErr> {
        if let Some(settings) = Entity::find_by_id(SETTINGS_ROW_ID).one(&self.db).await? {
            return Ok(settings);
        }

        ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            sync_enabled: Set(true),
            last_sync_at: Set(None),
        }
        .insert(&self.db)
        .await
    }

    /// Stamp the end of a scheduled batch.
    pub async fn set_last_sync_now(&self) -> Result<Model, DbErr> {
        let settings = self.load_or_init().await?;
        let mut active: ActiveModel = settings.into();
        active.last_sync_at = Set(Some(Utc::now().fixed_offset()));
        active.update(&self.db).await
    }
}
