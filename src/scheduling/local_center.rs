use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use tokio::{
    sync::RwLock,
    task::{self, JoinHandle},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{clock::Clock, reminder::ReminderId};

use super::{NotificationDeliveryChannel, NotificationRequest, NotificationService};

const FALLBACK_DELAY: Duration = Duration::from_secs(24 * 60 * 60);
const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

struct RegisteredNotification {
    task: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

/// In-process notification center. Each registration is a task that
/// sleeps until the trigger time in the clock's timezone, delivers, and
/// sleeps again until the same time on the next day, until cancelled.
pub struct LocalNotificationCenter {
    tasks: RwLock<HashMap<ReminderId, RegisteredNotification>>,
    delivery_channel: Arc<dyn NotificationDeliveryChannel>,
    clock: Arc<dyn Clock>,
    permission_granted: bool,
}

impl LocalNotificationCenter {
    pub fn new(
        delivery_channel: Arc<dyn NotificationDeliveryChannel>,
        clock: Arc<dyn Clock>,
        permission_granted: bool,
    ) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            delivery_channel,
            clock,
            permission_granted,
        }
    }

    fn create_notification_task(
        &self,
        request: NotificationRequest,
    ) -> anyhow::Result<RegisteredNotification> {
        let delay = next_delay(&request, self.clock.as_ref())?;
        log::info!(
            "[SCHEDULE] Sleeping for {:?} delay. ReminderId {}",
            delay,
            request.id
        );

        let cancellation_token = CancellationToken::new();
        let task_token = cancellation_token.child_token();
        let delivery_channel = Arc::clone(&self.delivery_channel);
        let clock = Arc::clone(&self.clock);
        let task = task::spawn(async move {
            run_notification(
                request,
                delivery_channel.as_ref(),
                clock.as_ref(),
                delay,
                task_token,
            )
            .await;
        });

        Ok(RegisteredNotification {
            task,
            cancellation_token,
        })
    }
}

impl Drop for LocalNotificationCenter {
    fn drop(&mut self) {
        for (_, registered) in self.tasks.get_mut().drain() {
            registered.cancellation_token.cancel();
        }
    }
}

#[async_trait]
impl NotificationService for LocalNotificationCenter {
    async fn request_permission(&self) -> anyhow::Result<bool> {
        Ok(self.permission_granted)
    }

    async fn register(&self, request: NotificationRequest) -> anyhow::Result<()> {
        if !self.permission_granted {
            anyhow::bail!("Notification permission was not granted");
        }

        match self.tasks.write().await.entry(request.id.clone()) {
            Entry::Vacant(entry) => {
                let registered = self.create_notification_task(request)?;
                entry.insert(registered);
            }
            Entry::Occupied(_) => {
                log::debug!("Notification already registered. ReminderId {}", request.id);
            }
        }

        Ok(())
    }

    async fn list_registered(&self) -> anyhow::Result<Vec<ReminderId>> {
        Ok(self.tasks.read().await.keys().cloned().collect())
    }

    async fn cancel(&self, ids: &[ReminderId]) {
        let removed: Vec<_> = {
            let mut tasks = self.tasks.write().await;
            ids.iter().filter_map(|id| tasks.remove(id)).collect()
        };

        for registered in removed {
            registered.cancellation_token.cancel();
            let _ = time::timeout(CANCEL_TIMEOUT, registered.task).await;
        }
    }
}

async fn run_notification(
    request: NotificationRequest,
    delivery: &dyn NotificationDeliveryChannel,
    clock: &dyn Clock,
    first_delay: Duration,
    cancellation_token: CancellationToken,
) {
    let mut delay = first_delay;
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                log::info!("[CANCEL] Notification cancelled. ReminderId {}", request.id);
                break;
            }
            _ = time::sleep(delay) => {
                delivery.deliver(&request).await;
                delay = next_delay(&request, clock).unwrap_or_else(|error| {
                    log::warn!(
                        "Could not compute next delay, retrying in {:?}. ReminderId {}, error = {}",
                        FALLBACK_DELAY,
                        request.id,
                        error
                    );
                    FALLBACK_DELAY
                });
                log::info!(
                    "[REPEAT] Sleeping for {:?} delay. ReminderId {}",
                    delay,
                    request.id
                );
            }
        }
    }
}

/// Real time until the next local occurrence of the request's trigger.
fn next_delay(request: &NotificationRequest, clock: &dyn Clock) -> anyhow::Result<Duration> {
    let now = clock.now();
    let target = now + get_target_delay(&request.trigger.time(), now);
    Ok(clock.until(target).to_std()?)
}

/// Time until the next occurrence of `fire_at`. Occurrences less than ten
/// seconds away roll over to the next day.
pub(crate) fn get_target_delay(fire_at: &NaiveTime, now: NaiveDateTime) -> chrono::Duration {
    let max_delta = TimeDelta::seconds(10);
    let delta = *fire_at - now.time();

    let today = now.date();
    let target_date = if delta <= max_delta {
        today.succ_opt().unwrap_or(today)
    } else {
        today
    };

    let target_datetime = target_date.and_time(*fire_at);

    target_datetime - now
}
