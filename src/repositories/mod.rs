//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for the sync catalogue: tasks, run logs, and global settings.

pub mod settings;
pub mod sync_log;
pub mod sync_task;

pub use settings::SettingsRepository;
pub use sync_log::{LogCompletion, SyncLogRepository};
pub use sync_task::{NewSyncTask, SyncTaskRepository};
