use async_trait::async_trait;

use crate::reminder::{DailyTrigger, Reminder, ReminderId};

/// A repeating daily notification, identified by its reminder id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub id: ReminderId,
    pub trigger: DailyTrigger,
    pub title: String,
}

impl NotificationRequest {
    pub fn new(id: ReminderId, trigger: DailyTrigger, title: String) -> Self {
        Self { id, trigger, title }
    }
}

impl From<&Reminder> for NotificationRequest {
    fn from(value: &Reminder) -> Self {
        Self::new(
            value.id.clone(),
            value.notification_time_of_day(),
            value.notification_title(),
        )
    }
}

/// Device notification center.
#[async_trait]
pub trait NotificationService: Send + Sync + 'static {
    async fn request_permission(&self) -> anyhow::Result<bool>;

    /// Registering an id that is already registered must leave the existing
    /// registration in place and succeed.
    async fn register(&self, request: NotificationRequest) -> anyhow::Result<()>;

    async fn list_registered(&self) -> anyhow::Result<Vec<ReminderId>>;

    async fn cancel(&self, ids: &[ReminderId]);
}
