use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    clock::Clock,
    collection::ReminderCollection,
    draft::{AddReminderAlert, ReminderDraft},
    error::{ReminderError, StorageError},
    reminder::{DayPart, PillIcon, Reminder, ReminderId},
    scheduling::{NotificationManager, NotificationService},
    storage::{PreferenceStore, ReminderStorage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationMode {
    #[default]
    Reminders,
    AddPillReminder,
}

/// Read-only row for one reminder in a day-part list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderView {
    pub id: ReminderId,
    pub name: String,
    pub dosage_text: String,
    pub time_text: String,
    pub icon: PillIcon,
    pub taken: bool,
}

impl ReminderView {
    fn new(reminder: &Reminder, day_part: DayPart) -> Self {
        Self {
            id: reminder.id.clone(),
            name: reminder.name.clone(),
            dosage_text: reminder.formatted_dosage(),
            time_text: reminder.formatted_time(day_part),
            icon: reminder.icon,
            taken: reminder.taken,
        }
    }
}

/// Everything the screen renders, published after each change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemindersSnapshot {
    pub navigation: NavigationMode,
    pub title: String,
    pub subtitle: String,
    pub has_reminders: bool,
    pub progress_subtitle: String,
    pub morning: Vec<ReminderView>,
    pub noon: Vec<ReminderView>,
    pub evening: Vec<ReminderView>,
}

impl RemindersSnapshot {
    pub fn reminders_for(&self, day_part: DayPart) -> &[ReminderView] {
        match day_part {
            DayPart::Morning => &self.morning,
            DayPart::Noon => &self.noon,
            DayPart::Evening => &self.evening,
        }
    }
}

/// Binds the reminder collection and notification scheduling to a screen.
/// Views read [`RemindersSnapshot`]s and call the action methods; they never
/// touch reminders directly.
pub struct PillReminderApp {
    collection: ReminderCollection,
    notifications: NotificationManager,
    clock: Arc<dyn Clock>,
    navigation: NavigationMode,
    draft: ReminderDraft,
    snapshot_tx: watch::Sender<RemindersSnapshot>,
}

impl PillReminderApp {
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        notification_service: Arc<dyn NotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let collection = ReminderCollection::new(ReminderStorage::new(store));
        let (snapshot_tx, _) = watch::channel(RemindersSnapshot::default());
        let app = Self {
            collection,
            notifications: NotificationManager::new(notification_service),
            clock,
            navigation: NavigationMode::Reminders,
            draft: ReminderDraft::new(),
            snapshot_tx,
        };
        app.publish();
        app
    }

    pub fn subscribe(&self) -> watch::Receiver<RemindersSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> RemindersSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn navigation(&self) -> NavigationMode {
        self.navigation
    }

    pub fn has_reminders(&self) -> bool {
        self.collection.has_reminders()
    }

    pub fn progress_subtitle(&self) -> &'static str {
        self.collection.progress_subtitle()
    }

    pub fn reminders_for(&self, day_part: DayPart) -> Vec<ReminderView> {
        self.collection
            .filter_sorted(day_part)
            .into_iter()
            .map(|reminder| ReminderView::new(reminder, day_part))
            .collect()
    }

    pub fn navigation_title(&self) -> &'static str {
        match self.navigation {
            NavigationMode::Reminders => "Today",
            NavigationMode::AddPillReminder => "Add Medication",
        }
    }

    pub fn navigation_subtitle(&self) -> &'static str {
        match self.navigation {
            NavigationMode::Reminders => self.progress_subtitle(),
            NavigationMode::AddPillReminder => "Just a few taps below",
        }
    }

    /// Reloads reminders and registers missing notifications. Does nothing
    /// while the add screen is shown.
    pub async fn refresh(&mut self) -> Result<(), StorageError> {
        if self.navigation != NavigationMode::Reminders {
            return Ok(());
        }

        self.collection.load_all(self.clock.today())?;
        self.notifications
            .schedule_all(self.collection.reminders(), self.collection.storage())
            .await;
        self.publish();
        Ok(())
    }

    pub fn start_adding(&mut self) {
        self.navigation = NavigationMode::AddPillReminder;
        self.draft = ReminderDraft::new();
        self.publish();
    }

    pub fn draft(&self) -> &ReminderDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut ReminderDraft {
        &mut self.draft
    }

    pub async fn exit_adding(&mut self) -> Result<(), StorageError> {
        self.navigation = NavigationMode::Reminders;
        self.refresh().await
    }

    /// Saves the draft being edited on the add screen.
    pub async fn add_current_draft(&mut self) -> Result<ReminderId, ReminderError> {
        let draft = self.draft.clone();
        self.add_reminder(&draft).await
    }

    /// Saves `draft`, asks for notification permission and returns to the
    /// reminders list. An invalid draft writes nothing.
    pub async fn add_reminder(&mut self, draft: &ReminderDraft) -> Result<ReminderId, ReminderError> {
        let id = self.collection.add(draft, self.clock.today())?;
        self.notifications.request_permission().await;
        self.exit_adding().await?;
        Ok(id)
    }

    /// Toggles the taken flag. Unknown ids are ignored.
    pub async fn mark_taken(&mut self, id: &str) -> Result<(), StorageError> {
        if self.collection.mark_taken(id, self.clock.today())? {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Deletes the reminder and its notification. Unknown ids are ignored.
    pub async fn delete(&mut self, id: &str) -> Result<(), StorageError> {
        if !self.collection.delete(id)? {
            return Ok(());
        }

        let id = id.to_string();
        self.notifications.cancel(&id).await;
        if let Err(error) = self.collection.storage().clear_notification_marker(&id) {
            log::warn!("Could not clear notification marker. [reminder_id = {id}, error = {error}]");
        }
        self.refresh().await?;
        self.cancel_orphaned_notifications().await;
        Ok(())
    }

    pub async fn cancel_orphaned_notifications(&self) -> Vec<ReminderId> {
        self.notifications
            .cancel_if_orphaned(self.collection.reminders())
            .await
    }

    fn publish(&self) {
        let snapshot = RemindersSnapshot {
            navigation: self.navigation,
            title: self.navigation_title().to_string(),
            subtitle: self.navigation_subtitle().to_string(),
            has_reminders: self.has_reminders(),
            progress_subtitle: self.progress_subtitle().to_string(),
            morning: self.reminders_for(DayPart::Morning),
            noon: self.reminders_for(DayPart::Noon),
            evening: self.reminders_for(DayPart::Evening),
        };

        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

impl AddReminderAlert {
    pub fn for_result(result: &Result<ReminderId, ReminderError>) -> Self {
        match result {
            Ok(_) => AddReminderAlert::Added,
            Err(_) => AddReminderAlert::Missing,
        }
    }
}
