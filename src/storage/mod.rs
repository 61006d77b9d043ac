mod model;
mod preferences;
mod reminder_storage;

pub use model::{InvalidRecord, StoredReminder};
pub use preferences::{InMemoryPreferenceStore, JsonFilePreferenceStore, PreferenceStore};
pub use reminder_storage::{REMINDERS_KEY, ReminderStorage};
