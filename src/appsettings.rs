use std::path::PathBuf;

use anyhow::anyhow;
use chrono_tz::Tz;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct StorageSettings {
    pub path: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NotificationSettings {
    pub permission_granted: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    pub timezone: String,
    pub refresh_interval_secs: u64,
    pub storage: StorageSettings,
    pub notifications: NotificationSettings,
}

impl AppSettings {
    /// Reads `appsettings[.local].toml` from the working directory, then
    /// `MEDREMIND__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(
                Environment::with_prefix("MEDREMIND")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("timezone", "UTC")?
            .set_default("refresh_interval_secs", 60)?
            .set_default("storage.path", "medremind.json")?
            .set_default("notifications.permission_granted", true)
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|error| anyhow!("Unknown timezone '{}': {error}", self.timezone))
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
