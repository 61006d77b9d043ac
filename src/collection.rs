use chrono::NaiveDate;

use crate::{
    draft::ReminderDraft,
    error::{ReminderError, StorageError},
    reminder::{DayPart, Reminder, ReminderId, apply_daily_reset},
    storage::ReminderStorage,
};

pub const PROGRESS_WITH_REMINDERS: &str = "It's time for your meds";
pub const PROGRESS_WITHOUT_REMINDERS: &str = "No medication saved";

/// In-memory working set of reminders, filled from storage.
pub struct ReminderCollection {
    storage: ReminderStorage,
    reminders: Vec<Reminder>,
}

impl ReminderCollection {
    pub fn new(storage: ReminderStorage) -> Self {
        Self {
            storage,
            reminders: Vec::new(),
        }
    }

    pub fn storage(&self) -> &ReminderStorage {
        &self.storage
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn get(&self, id: &str) -> Option<&Reminder> {
        self.reminders.iter().find(|reminder| reminder.id == id)
    }

    pub fn has_reminders(&self) -> bool {
        !self.reminders.is_empty()
    }

    pub fn progress_subtitle(&self) -> &'static str {
        if self.has_reminders() {
            PROGRESS_WITH_REMINDERS
        } else {
            PROGRESS_WITHOUT_REMINDERS
        }
    }

    /// Appends stored reminders whose id is not loaded yet. Reminders that
    /// are already in memory keep their current state; only the daily reset
    /// is applied to them. Returns how many reminders were added.
    pub fn load_all(&mut self, today: NaiveDate) -> Result<usize, StorageError> {
        let loaded = std::mem::take(&mut self.reminders);
        self.reminders = loaded
            .into_iter()
            .map(|reminder| apply_daily_reset(reminder, today))
            .collect();

        let mut added = 0;
        for (id, record) in self.storage.load_all()? {
            if self.get(&id).is_some() {
                continue;
            }
            match record.into_reminder(id.clone()) {
                Ok(reminder) => {
                    self.reminders.push(apply_daily_reset(reminder, today));
                    added += 1;
                }
                Err(error) => {
                    log::warn!("Skipping invalid reminder. [reminder_id = {id}, error = {error}]")
                }
            }
        }

        if added > 0 {
            log::debug!("Loaded {added} new reminders");
        }
        Ok(added)
    }

    /// Reminders scheduled in `day_part`, earliest first.
    pub fn filter_sorted(&self, day_part: DayPart) -> Vec<&Reminder> {
        let mut matching: Vec<&Reminder> = self
            .reminders
            .iter()
            .filter(|reminder| reminder.time_for(day_part).is_some())
            .collect();

        if matching.len() > 1 {
            matching.sort_by_key(|reminder| reminder.time_for(day_part).copied());
        }
        matching
    }

    /// Validates and saves `draft` as a new record. The reminder shows up in
    /// memory on the next `load_all`.
    pub fn add(&self, draft: &ReminderDraft, today: NaiveDate) -> Result<ReminderId, ReminderError> {
        let record = draft.to_persistable(today)?;
        let id = self.storage.insert(record)?;
        Ok(id)
    }

    /// Flips the taken flag of `id` and persists it. Memory changes only
    /// after the write succeeded. Returns `false` when no such reminder is
    /// loaded.
    pub fn mark_taken(&mut self, id: &str, today: NaiveDate) -> Result<bool, StorageError> {
        let Some(reminder) = self.reminders.iter_mut().find(|reminder| reminder.id == id) else {
            log::debug!("Cannot mark reminder taken, not loaded. [reminder_id = {id}]");
            return Ok(false);
        };

        let mut toggled = reminder.clone();
        toggled.toggle_taken(today);
        self.storage
            .set_taken(id, toggled.taken, toggled.last_marked)?;
        *reminder = toggled;
        Ok(true)
    }

    /// Removes `id` from storage, then from memory. Returns `false` when no
    /// such reminder is loaded.
    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let Some(index) = self.reminders.iter().position(|reminder| reminder.id == id) else {
            log::debug!("Cannot delete reminder, not loaded. [reminder_id = {id}]");
            return Ok(false);
        };

        self.storage.remove(id)?;
        self.reminders.remove(index);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    };

    use chrono::NaiveTime;
    use proptest::prelude::*;
    use serde_json::Value;

    use super::*;
    use crate::{
        error::ValidationError,
        reminder::PillIcon,
        storage::{InMemoryPreferenceStore, PreferenceStore, StoredReminder},
    };

    /// In-memory store whose writes fail while `failing` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryPreferenceStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(io::Error::other("disk full").into());
            }
            Ok(())
        }
    }

    impl PreferenceStore for FlakyStore {
        fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: Value) -> Result<(), StorageError> {
            self.check()?;
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.check()?;
            self.inner.remove(key)
        }
    }

    fn flaky_collection() -> (Arc<FlakyStore>, ReminderCollection) {
        let store = Arc::new(FlakyStore::default());
        let collection = ReminderCollection::new(ReminderStorage::new(store.clone()));
        (store, collection)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    fn collection() -> ReminderCollection {
        let store = Arc::new(InMemoryPreferenceStore::new());
        ReminderCollection::new(ReminderStorage::new(store))
    }

    fn draft(name: &str, day_part: DayPart, hour: u32, minute: u32) -> ReminderDraft {
        let mut draft = ReminderDraft::new();
        draft.set_name(name);
        draft.select_day_part(day_part);
        draft.set_time(NaiveTime::from_hms_opt(hour, minute, 0));
        draft
    }

    fn names(reminders: &[&Reminder]) -> Vec<String> {
        reminders.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn empty_collection_has_no_reminders() {
        let mut collection = collection();
        collection.load_all(today()).unwrap();

        assert!(!collection.has_reminders());
        assert_eq!(collection.progress_subtitle(), PROGRESS_WITHOUT_REMINDERS);
    }

    #[test]
    fn added_reminder_appears_after_load() {
        let mut collection = collection();
        let mut aspirin = draft("Aspirin", DayPart::Morning, 8, 0);
        aspirin.set_dosage(2);

        let id = collection.add(&aspirin, today()).unwrap();
        collection.load_all(today()).unwrap();

        let reminder = collection.get(&id).unwrap();
        assert_eq!(reminder.name, "Aspirin");
        assert_eq!(reminder.formatted_dosage(), "Take 2 pills");
        assert_eq!(reminder.formatted_time(DayPart::Morning), "8:00 AM");
        assert!(!reminder.taken);
        assert_eq!(collection.progress_subtitle(), PROGRESS_WITH_REMINDERS);
    }

    #[test]
    fn invalid_draft_is_not_written() {
        let mut collection = collection();

        let result = collection.add(&ReminderDraft::new(), today());
        collection.load_all(today()).unwrap();

        assert!(matches!(
            result,
            Err(ReminderError::Validation(ValidationError::MissingName))
        ));
        assert!(!collection.has_reminders());
    }

    #[test]
    fn load_is_additive_per_id() {
        let mut collection = collection();
        let id = collection
            .add(&draft("Aspirin", DayPart::Morning, 8, 0), today())
            .unwrap();
        collection.load_all(today()).unwrap();
        collection.reminders[0].name = "Edited".to_string();

        let added = collection.load_all(today()).unwrap();

        assert_eq!(added, 0);
        assert_eq!(collection.reminders().len(), 1);
        assert_eq!(collection.get(&id).unwrap().name, "Edited");
    }

    #[test]
    fn noon_reminders_are_sorted_by_time() {
        let mut collection = collection();
        collection
            .add(&draft("Late", DayPart::Noon, 12, 30), today())
            .unwrap();
        collection
            .add(&draft("Early", DayPart::Noon, 12, 5), today())
            .unwrap();
        collection
            .add(&draft("Breakfast", DayPart::Morning, 8, 0), today())
            .unwrap();
        collection.load_all(today()).unwrap();

        assert_eq!(names(&collection.filter_sorted(DayPart::Noon)), ["Early", "Late"]);
        assert_eq!(names(&collection.filter_sorted(DayPart::Morning)), ["Breakfast"]);
        assert!(collection.filter_sorted(DayPart::Evening).is_empty());
    }

    #[test]
    fn mark_taken_toggles_and_persists() {
        let mut collection = collection();
        let id = collection
            .add(&draft("Aspirin", DayPart::Morning, 8, 0), today())
            .unwrap();
        collection.load_all(today()).unwrap();

        assert!(collection.mark_taken(&id, today()).unwrap());

        assert!(collection.get(&id).unwrap().taken);
        assert!(collection.storage().get(&id).unwrap().unwrap().taken);
    }

    #[test]
    fn mark_taken_on_unknown_id_changes_nothing() {
        let mut collection = collection();
        collection
            .add(&draft("Aspirin", DayPart::Morning, 8, 0), today())
            .unwrap();
        collection.load_all(today()).unwrap();
        let before = collection.reminders().to_vec();

        assert!(!collection.mark_taken("missing", today()).unwrap());
        assert_eq!(collection.reminders(), before.as_slice());
    }

    #[test]
    fn taken_flag_resets_on_next_day_load() {
        let mut collection = collection();
        let id = collection
            .add(&draft("Aspirin", DayPart::Morning, 8, 0), today())
            .unwrap();
        collection.load_all(today()).unwrap();
        collection.mark_taken(&id, today()).unwrap();

        collection.load_all(today().succ_opt().unwrap()).unwrap();

        assert!(!collection.get(&id).unwrap().taken);
    }

    #[test]
    fn stored_taken_flag_from_previous_day_is_reset_on_load() {
        let mut collection = collection();
        let id = collection
            .add(&draft("Aspirin", DayPart::Evening, 20, 0), today())
            .unwrap();
        collection.mark_taken_in_storage(&id);

        collection.load_all(today().succ_opt().unwrap()).unwrap();

        assert!(!collection.get(&id).unwrap().taken);
    }

    #[test]
    fn delete_removes_from_memory_and_storage() {
        let mut collection = collection();
        let id = collection
            .add(&draft("Aspirin", DayPart::Morning, 8, 0), today())
            .unwrap();
        collection.load_all(today()).unwrap();

        assert!(collection.delete(&id).unwrap());
        collection.load_all(today()).unwrap();

        assert!(collection.get(&id).is_none());
        assert!(collection.storage().get(&id).unwrap().is_none());
        assert!(!collection.delete(&id).unwrap());
    }

    #[test]
    fn failed_mark_taken_leaves_reminder_untouched() {
        let (store, mut collection) = flaky_collection();
        let id = collection
            .add(&draft("Aspirin", DayPart::Morning, 8, 0), today())
            .unwrap();
        collection.load_all(today()).unwrap();
        let before = collection.get(&id).unwrap().clone();
        store.failing.store(true, Ordering::SeqCst);

        assert!(matches!(
            collection.mark_taken(&id, today().succ_opt().unwrap()),
            Err(StorageError::Io(_))
        ));

        assert_eq!(collection.get(&id), Some(&before));
        assert!(!collection.storage().get(&id).unwrap().unwrap().taken);
    }

    #[test]
    fn failed_delete_keeps_reminder_loaded() {
        let (store, mut collection) = flaky_collection();
        let id = collection
            .add(&draft("Aspirin", DayPart::Morning, 8, 0), today())
            .unwrap();
        collection.load_all(today()).unwrap();
        store.failing.store(true, Ordering::SeqCst);

        assert!(collection.delete(&id).is_err());

        assert!(collection.get(&id).is_some());
        assert!(collection.storage().get(&id).unwrap().is_some());

        store.failing.store(false, Ordering::SeqCst);
        assert!(collection.delete(&id).unwrap());
        assert!(collection.get(&id).is_none());
    }

    impl ReminderCollection {
        fn mark_taken_in_storage(&self, id: &str) {
            let record: StoredReminder = self.storage.get(id).unwrap().unwrap();
            self.storage
                .set_taken(id, true, record.marked_day())
                .unwrap();
        }
    }

    const ICONS: [PillIcon; 6] = [
        PillIcon::Blue,
        PillIcon::White,
        PillIcon::Orange,
        PillIcon::Polygon,
        PillIcon::Red,
        PillIcon::Other,
    ];

    fn day_part_of(hour: u32) -> DayPart {
        match hour {
            0..=11 => DayPart::Morning,
            12..=16 => DayPart::Noon,
            _ => DayPart::Evening,
        }
    }

    proptest! {
        #[test]
        fn saved_draft_loads_back_unchanged(
            name in "[A-Za-z][A-Za-z0-9 ]{0,20}",
            dosage in 1u32..20,
            icon in 0usize..ICONS.len(),
            hour in 0u32..24,
            minute in 0u32..60,
        ) {
            let day_part = day_part_of(hour);
            let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
            let mut draft = ReminderDraft::new();
            draft.set_name(name.clone());
            draft.set_dosage(dosage);
            draft.set_icon(ICONS[icon]);
            draft.select_day_part(day_part);
            draft.set_time(Some(time));

            let mut collection = collection();
            let id = collection.add(&draft, today()).unwrap();
            collection.load_all(today()).unwrap();
            let reminder = collection.get(&id).unwrap();

            prop_assert_eq!(&reminder.name, &name);
            prop_assert_eq!(reminder.dosage.count(), dosage);
            prop_assert_eq!(reminder.icon, ICONS[icon]);
            prop_assert_eq!(reminder.schedule.day_part, day_part);
            prop_assert_eq!(*reminder.schedule.fire_at.time(), time);
            prop_assert!(!reminder.taken);
            for other in DayPart::ALL.into_iter().filter(|part| *part != day_part) {
                prop_assert!(reminder.time_for(other).is_none());
            }
        }

        #[test]
        fn filter_sorted_is_ordered_and_complete(
            times in proptest::collection::vec((0u32..24, 0u32..60), 0..12)
        ) {
            let mut collection = collection();
            for (i, (hour, minute)) in times.iter().enumerate() {
                let day_part = day_part_of(*hour);
                collection.add(&draft(&format!("pill {i}"), day_part, *hour, *minute), today()).unwrap();
            }
            collection.load_all(today()).unwrap();

            let mut total = 0;
            for day_part in DayPart::ALL {
                let filtered = collection.filter_sorted(day_part);
                total += filtered.len();
                prop_assert!(filtered.iter().all(|r| r.time_for(day_part).is_some()));
                prop_assert!(filtered.windows(2).all(|w| w[0].time_for(day_part) <= w[1].time_for(day_part)));
            }
            prop_assert_eq!(total, times.len());
        }
    }
}
