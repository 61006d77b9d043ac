use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    error::StorageError,
    reminder::{MarkedDay, ReminderId},
};

use super::{PreferenceStore, StoredReminder};

pub const REMINDERS_KEY: &str = "reminders";
const SCHEDULED_MARKER_PREFIX: &str = "notification_scheduled.";

/// Typed access to the `reminders` table and the per-reminder
/// "notification scheduled" markers.
#[derive(Clone)]
pub struct ReminderStorage {
    store: Arc<dyn PreferenceStore>,
}

impl ReminderStorage {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// All well-formed records. Entries that fail to deserialize are
    /// skipped.
    pub fn load_all(&self) -> Result<Vec<(ReminderId, StoredReminder)>, StorageError> {
        let table = self.read_table()?;
        let records = table
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(record) => Some((id, record)),
                Err(error) => {
                    log::warn!("Skipping malformed reminder record. [reminder_id = {id}, error = {error}]");
                    None
                }
            })
            .collect();

        Ok(records)
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredReminder>, StorageError> {
        let mut table = self.read_table()?;
        table
            .remove(id)
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    pub fn insert(&self, record: StoredReminder) -> Result<ReminderId, StorageError> {
        let id = uuid::Uuid::new_v4().to_string().to_uppercase();
        let mut table = self.read_table()?;
        table.insert(id.clone(), serde_json::to_value(record)?);
        self.write_table(table)?;

        log::info!("Saved reminder {id}");
        Ok(id)
    }

    /// Rewrites the taken flag of one record and leaves every other field
    /// and record untouched. Returns `false` when `id` is not stored.
    pub fn set_taken(
        &self,
        id: &str,
        taken: bool,
        marked: MarkedDay,
    ) -> Result<bool, StorageError> {
        let mut table = self.read_table()?;
        let Some(Value::Object(record)) = table.get_mut(id) else {
            log::debug!("No stored record to mark taken. [reminder_id = {id}]");
            return Ok(false);
        };

        record.insert("taken".to_string(), Value::Bool(taken));
        record.insert(
            "lastMarkedDay".to_string(),
            Value::from(marked.day_of_month()),
        );
        match marked.date() {
            Some(date) => record.insert("lastMarkedDate".to_string(), serde_json::to_value(date)?),
            None => record.remove("lastMarkedDate"),
        };

        self.write_table(table)?;
        Ok(true)
    }

    pub fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let mut table = self.read_table()?;
        let removed = table.remove(id).is_some();
        if removed {
            self.write_table(table)?;
        }
        Ok(removed)
    }

    pub fn is_notification_scheduled(&self, id: &str) -> Result<bool, StorageError> {
        let value = self.store.read(&marker_key(id))?;
        Ok(matches!(value, Some(Value::Bool(true))))
    }

    pub fn mark_notification_scheduled(&self, id: &str) -> Result<(), StorageError> {
        self.store.write(&marker_key(id), Value::Bool(true))
    }

    pub fn clear_notification_marker(&self, id: &str) -> Result<(), StorageError> {
        self.store.remove(&marker_key(id))
    }

    fn read_table(&self) -> Result<Map<String, Value>, StorageError> {
        match self.store.read(REMINDERS_KEY)? {
            Some(Value::Object(table)) => Ok(table),
            Some(other) => {
                log::warn!("Ignoring reminders table of unexpected shape: {other}");
                Ok(Map::new())
            }
            None => Ok(Map::new()),
        }
    }

    fn write_table(&self, table: Map<String, Value>) -> Result<(), StorageError> {
        self.store.write(REMINDERS_KEY, Value::Object(table))
    }
}

fn marker_key(id: &str) -> String {
    format!("{SCHEDULED_MARKER_PREFIX}{id}")
}
