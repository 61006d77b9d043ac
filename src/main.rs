use std::sync::Arc;

use anyhow::Context;
use medremind::{
    app::{PillReminderApp, RemindersSnapshot},
    appsettings::AppSettings,
    clock::{Clock, LocalClock},
    reminder::DayPart,
    scheduling::{LocalNotificationCenter, LogDeliveryChannel},
    storage::JsonFilePreferenceStore,
};

fn log_snapshot(snapshot: &RemindersSnapshot) {
    log::info!("{} - {}", snapshot.title, snapshot.subtitle);
    for day_part in DayPart::ALL {
        for view in snapshot.reminders_for(day_part) {
            log::info!(
                "[{day_part}] {} {} at {} (taken = {})",
                view.name,
                view.dosage_text,
                view.time_text,
                view.taken
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    pretty_env_logger::init();

    let settings = AppSettings::load().context("Could not load settings")?;
    let clock: Arc<dyn Clock> = Arc::new(LocalClock::new(settings.timezone()?));
    let store = JsonFilePreferenceStore::open(&settings.storage.path)
        .with_context(|| format!("Could not open {}", settings.storage.path.display()))?;
    let notification_center = LocalNotificationCenter::new(
        Arc::new(LogDeliveryChannel),
        Arc::clone(&clock),
        settings.notifications.permission_granted,
    );

    log::info!(
        "Starting medremind. [storage = {}, timezone = {}]",
        store.path().display(),
        settings.timezone
    );

    let mut app = PillReminderApp::new(Arc::new(store), Arc::new(notification_center), clock);
    app.refresh().await?;
    let cancelled = app.cancel_orphaned_notifications().await;
    if !cancelled.is_empty() {
        log::info!("Cancelled orphaned notifications. [ids = {cancelled:?}]");
    }

    let mut snapshots = app.subscribe();
    log_snapshot(&snapshots.borrow_and_update());

    let mut interval = tokio::time::interval(settings.refresh_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
            _ = interval.tick() => {
                if let Err(error) = app.refresh().await {
                    log::error!("Refresh failed. error = {error}");
                    continue;
                }
                if snapshots.has_changed().unwrap_or(false) {
                    log_snapshot(&snapshots.borrow_and_update());
                }
            }
        }
    }

    Ok(())
}
