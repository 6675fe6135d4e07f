//! Downstream storage for finished wizard runs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DatabaseError;
use crate::store::Database;
use crate::wizard::model::settings_keys;
use crate::wizard::record::{FieldTask, FinishedRecord, PlantingArea};

/// Receives the finished record once the review step is confirmed.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Register the record for `user_id` and return the created area.
    async fn accept(
        &self,
        user_id: &str,
        record: &FinishedRecord,
    ) -> Result<PlantingArea, DatabaseError>;
}

/// Record sink that keeps areas and tasks as JSON lists in the settings table.
pub struct SettingsRecordSink {
    db: Arc<dyn Database>,
}

impl SettingsRecordSink {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Registered planting areas for a user, oldest first.
    pub async fn list_areas(&self, user_id: &str) -> Result<Vec<PlantingArea>, DatabaseError> {
        self.read_list(user_id, settings_keys::PLANTING_AREAS).await
    }

    /// Field tasks for a user, oldest first.
    pub async fn list_tasks(&self, user_id: &str) -> Result<Vec<FieldTask>, DatabaseError> {
        self.read_list(user_id, settings_keys::FIELD_TASKS).await
    }

    async fn read_list<T: DeserializeOwned>(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Vec<T>, DatabaseError> {
        // Unparsable stored values come back as Null; never treat them as empty.
        match self.db.get_setting(user_id, key).await? {
            None => Ok(Vec::new()),
            Some(serde_json::Value::Null) => Err(DatabaseError::Serialization(format!(
                "{key}: stored value is not valid JSON"
            ))),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| DatabaseError::Serialization(format!("{key}: {e}"))),
        }
    }

    async fn write_list<T: Serialize>(
        &self,
        user_id: &str,
        key: &str,
        items: &[T],
    ) -> Result<(), DatabaseError> {
        let value =
            serde_json::to_value(items).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.db.set_setting(user_id, key, &value).await
    }

    /// Append `item` and return the list as it was before.
    async fn append<T: Serialize + DeserializeOwned + Clone>(
        &self,
        user_id: &str,
        key: &str,
        item: T,
    ) -> Result<Vec<T>, DatabaseError> {
        let previous: Vec<T> = self.read_list(user_id, key).await?;
        let mut items = previous.clone();
        items.push(item);
        self.write_list(user_id, key, &items).await?;
        Ok(previous)
    }
}

#[async_trait]
impl RecordSink for SettingsRecordSink {
    async fn accept(
        &self,
        user_id: &str,
        record: &FinishedRecord,
    ) -> Result<PlantingArea, DatabaseError> {
        let area = PlantingArea::from_record(user_id, record);
        let previous = self
            .append(user_id, settings_keys::PLANTING_AREAS, area.clone())
            .await?;

        if record.soil_reminder_due {
            let task = FieldTask::soil_correction(&area, &record.answers.soil.pending_items);
            let title = task.title.clone();
            if let Err(e) = self.append(user_id, settings_keys::FIELD_TASKS, task).await {
                // Undo the area so a retry does not register it twice.
                if let Err(undo) = self
                    .write_list(user_id, settings_keys::PLANTING_AREAS, &previous)
                    .await
                {
                    tracing::error!(user_id, area_id = %area.id, error = %undo, "Failed to roll back planting area");
                }
                return Err(e);
            }
            tracing::info!(user_id, area_id = %area.id, title = %title, "Soil correction task created");
        }

        tracing::info!(user_id, area_id = %area.id, name = %area.name, "Planting area registered");
        Ok(area)
    }
}
