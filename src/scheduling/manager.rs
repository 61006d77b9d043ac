use std::{collections::HashSet, sync::Arc};

use tokio::task::JoinSet;

use crate::{
    reminder::{Reminder, ReminderId},
    storage::ReminderStorage,
};

use super::{NotificationRequest, NotificationService};

/// Keeps the notification service in line with the loaded reminders.
#[derive(Clone)]
pub struct NotificationManager {
    service: Arc<dyn NotificationService>,
}

impl NotificationManager {
    pub fn new(service: Arc<dyn NotificationService>) -> Self {
        Self { service }
    }

    pub async fn request_permission(&self) -> bool {
        match self.service.request_permission().await {
            Ok(true) => true,
            Ok(false) => {
                log::warn!("User declined push notification permissions");
                false
            }
            Err(error) => {
                log::warn!("Could not request notification permission. error = {error}");
                false
            }
        }
    }

    /// Registers a daily notification for every reminder that is not both
    /// marked as scheduled and listed by the service, and marks the ones
    /// that succeed. A marker without a live registration (a restarted
    /// notification center) is registered again. Failed registrations stay
    /// unmarked and are retried on the next call. Returns how many
    /// registrations succeeded.
    pub async fn schedule_all(&self, reminders: &[Reminder], storage: &ReminderStorage) -> usize {
        let registered: HashSet<ReminderId> = match self.service.list_registered().await {
            Ok(registered) => registered.into_iter().collect(),
            Err(error) => {
                log::warn!("Could not list registered notifications. error = {error}");
                HashSet::new()
            }
        };

        let mut registrations = JoinSet::new();
        for reminder in reminders {
            match storage.is_notification_scheduled(&reminder.id) {
                Ok(true) if registered.contains(&reminder.id) => continue,
                Ok(true) => log::info!(
                    "Notification marked as scheduled but not registered. [reminder_id = {}]",
                    reminder.id
                ),
                Ok(false) => {}
                Err(error) => {
                    log::warn!(
                        "Could not read notification marker. [reminder_id = {}, error = {}]",
                        reminder.id,
                        error
                    );
                    continue;
                }
            }

            let request = NotificationRequest::from(reminder);
            let service = Arc::clone(&self.service);
            registrations.spawn(async move {
                let id = request.id.clone();
                (id, service.register(request).await)
            });
        }

        let mut scheduled = 0;
        while let Some(joined) = registrations.join_next().await {
            let (id, result) = match joined {
                Ok(outcome) => outcome,
                Err(error) => {
                    log::warn!("Notification registration task failed. error = {error}");
                    continue;
                }
            };

            match result {
                Ok(()) => match storage.mark_notification_scheduled(&id) {
                    Ok(()) => scheduled += 1,
                    Err(error) => log::warn!(
                        "Could not store notification marker. [reminder_id = {id}, error = {error}]"
                    ),
                },
                Err(error) => {
                    log::warn!("NOTIFICATION ERROR: {error} [reminder_id = {id}]")
                }
            }
        }

        scheduled
    }

    pub async fn cancel(&self, id: &ReminderId) {
        self.service.cancel(std::slice::from_ref(id)).await;
    }

    /// Cancels registered notifications whose reminder is not loaded.
    /// Returns the cancelled ids.
    pub async fn cancel_if_orphaned(&self, reminders: &[Reminder]) -> Vec<ReminderId> {
        let registered = match self.service.list_registered().await {
            Ok(registered) => registered,
            Err(error) => {
                log::warn!("Could not list registered notifications. error = {error}");
                return Vec::new();
            }
        };

        let orphaned: Vec<ReminderId> = registered
            .into_iter()
            .filter(|id| !reminders.iter().any(|reminder| &reminder.id == id))
            .collect();

        if !orphaned.is_empty() {
            log::info!("Removing {} orphaned notifications", orphaned.len());
            self.service.cancel(&orphaned).await;
        }
        orphaned
    }
}

#[cfg(test)]
pub(crate) mod test_service {
    use std::{
        collections::{BTreeMap, HashSet},
        sync::Mutex,
    };

    use async_trait::async_trait;

    use crate::{
        reminder::ReminderId,
        scheduling::{NotificationRequest, NotificationService},
    };

    /// Records registrations in memory. Ids listed in `failing` are rejected.
    #[derive(Default)]
    pub struct RecordingNotificationService {
        pub registered: Mutex<BTreeMap<ReminderId, NotificationRequest>>,
        pub failing: Mutex<HashSet<ReminderId>>,
        pub attempts: Mutex<Vec<ReminderId>>,
        pub deny_permission: bool,
    }

    impl RecordingNotificationService {
        pub fn fail_for(&self, id: &str) {
            self.failing.lock().unwrap().insert(id.to_string());
        }

        pub fn stop_failing(&self) {
            self.failing.lock().unwrap().clear();
        }

        pub fn registered_ids(&self) -> Vec<ReminderId> {
            self.registered.lock().unwrap().keys().cloned().collect()
        }

        pub fn attempts(&self) -> Vec<ReminderId> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationService for RecordingNotificationService {
        async fn request_permission(&self) -> anyhow::Result<bool> {
            Ok(!self.deny_permission)
        }

        async fn register(&self, request: NotificationRequest) -> anyhow::Result<()> {
            self.attempts.lock().unwrap().push(request.id.clone());
            if self.failing.lock().unwrap().contains(&request.id) {
                anyhow::bail!("registration rejected");
            }
            self.registered
                .lock()
                .unwrap()
                .entry(request.id.clone())
                .or_insert(request);
            Ok(())
        }

        async fn list_registered(&self) -> anyhow::Result<Vec<ReminderId>> {
            Ok(self.registered_ids())
        }

        async fn cancel(&self, ids: &[ReminderId]) {
            let mut registered = self.registered.lock().unwrap();
            for id in ids {
                registered.remove(id);
            }
        }
    }
}
