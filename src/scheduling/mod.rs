mod delivery;
mod local_center;
mod manager;
mod notification;

pub use delivery::{LogDeliveryChannel, NotificationDeliveryChannel};
pub use local_center::LocalNotificationCenter;
pub use manager::NotificationManager;
pub use notification::{NotificationRequest, NotificationService};

#[cfg(test)]
pub(crate) use manager::test_service;
