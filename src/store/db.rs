//! SeaORM-backed document store.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use super::{DocumentStore, StoreError, SyncTarget};
use crate::models::{document, wp_table_data};

/// Document store over any SeaORM connection. The engine hands it a
/// transaction so every row written for one task commits in one batch.
pub struct DbDocumentStore<'c, C: ConnectionTrait> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> DbDocumentStore<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    async fn find_document(
        &self,
        doctype: &str,
        source_id: &str,
    ) -> Result<Option<document::Model>, StoreError> {
        Ok(document::Entity::find()
            .filter(document::Column::Doctype.eq(doctype))
            .filter(document::Column::WpSourceId.eq(source_id))
            .one(self.conn)
            .await?)
    }

    async fn find_generic(
        &self,
        table: &str,
        source_id: &str,
    ) -> Result<Option<wp_table_data::Model>, StoreError> {
        Ok(wp_table_data::Entity::find()
            .filter(wp_table_data::Column::TableName.eq(table))
            .filter(wp_table_data::Column::RecordId.eq(source_id))
            .one(self.conn)
            .await?)
    }
}

#[async_trait]
impl<C: ConnectionTrait> DocumentStore for DbDocumentStore<'_, C> {
    async fn exists(&self, target: &SyncTarget, source_id: &str) -> Result<bool, StoreError> {
        match target {
            SyncTarget::Doctype { doctype, .. } => {
                Ok(self.find_document(doctype, source_id).await?.is_some())
            }
            SyncTarget::Generic { source_table } => {
                Ok(self.find_generic(source_table, source_id).await?.is_some())
            }
        }
    }

    async fn get(
        &self,
        target: &SyncTarget,
        source_id: &str,
    ) -> Result<Option<JsonValue>, StoreError> {
        match target {
            SyncTarget::Doctype { doctype, .. } => Ok(self
                .find_document(doctype, source_id)
                .await?
                .map(|doc| doc.fields)),
            SyncTarget::Generic { source_table } => Ok(self
                .find_generic(source_table, source_id)
                .await?
                .map(|record| record.data)),
        }
    }

    async fn insert(
        &self,
        target: &SyncTarget,
        source_id: &str,
        fields: Map<String, JsonValue>,
    ) -> Result<(), StoreError> {
        let now = Utc::now().fixed_offset();
        match target {
            SyncTarget::Doctype {
                doctype,
                source_table,
            } => {
                document::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    doctype: Set(doctype.clone()),
                    wp_source_table: Set(source_table.clone()),
                    wp_source_id: Set(source_id.to_string()),
                    wp_synced_at: Set(now),
                    fields: Set(JsonValue::Object(fields)),
                }
                .insert(self.conn)
                .await?;
            }
            SyncTarget::Generic { source_table } => {
                wp_table_data::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    table_name: Set(source_table.clone()),
                    record_id: Set(source_id.to_string()),
                    data: Set(JsonValue::Object(fields)),
                    synced_at: Set(now),
                }
                .insert(self.conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn save(
        &self,
        target: &SyncTarget,
        source_id: &str,
        fields: Map<String, JsonValue>,
    ) -> Result<(), StoreError> {
        let now = Utc::now().fixed_offset();
        match target {
            SyncTarget::Doctype { doctype, .. } => {
                let existing = self
                    .find_document(doctype, source_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("{doctype}/{source_id}")))?;

                // Merge into the stored object; keys absent from the patch
                // keep their stored value.
                let mut merged = match existing.fields.clone() {
                    JsonValue::Object(object) => object,
                    _ => Map::new(),
                };
                for (key, value) in fields {
                    merged.insert(key, value);
                }

                let mut active: document::ActiveModel = existing.into();
                active.fields = Set(JsonValue::Object(merged));
                active.wp_synced_at = Set(now);
                active.update(self.conn).await?;
            }
            SyncTarget::Generic { source_table } => {
                let existing = self
                    .find_generic(source_table, source_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("{source_table}/{source_id}")))?;

                let mut active: wp_table_data::ActiveModel = existing.into();
                active.data = Set(JsonValue::Object(fields));
                active.synced_at = Set(now);
                active.update(self.conn).await?;
            }
        }
        Ok(())
    }
}
