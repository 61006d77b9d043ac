use async_trait::async_trait;

use super::NotificationRequest;

#[async_trait]
pub trait NotificationDeliveryChannel: Send + Sync + 'static {
    async fn deliver(&self, notification: &NotificationRequest);
}

/// Writes fired notifications to the log.
pub struct LogDeliveryChannel;

#[async_trait]
impl NotificationDeliveryChannel for LogDeliveryChannel {
    async fn deliver(&self, notification: &NotificationRequest) {
        log::info!(
            "🔔 {} [reminder_id = {}, at = {:02}:{:02}]",
            notification.title,
            notification.id,
            notification.trigger.hour,
            notification.trigger.minute
        );
    }
}
