//! Settings for the client session.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use telephony_core::InputZone;

use crate::error::SettingsError;
use crate::notice::DEFAULT_NOTICE_WINDOW;

/// Default live-view refresh period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Session settings.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Period of the live-view refresh.
    pub refresh_interval: Duration,
    /// How long success and error notices stay visible.
    pub notice_window: Duration,
    /// JSON file for persisted preferences; in-memory when `None`.
    pub preferences_path: Option<PathBuf>,
    /// Zone used to read typed date/times.
    pub zone: InputZone,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            notice_window: DEFAULT_NOTICE_WINDOW,
            preferences_path: None,
            zone: InputZone::System,
        }
    }
}

impl SchedulerSettings {
    /// Read settings from environment variables.
    ///
    /// Optional environment variables:
    /// - `OUTBOUND_REFRESH_SECS` - Live refresh period (default: 30)
    /// - `OUTBOUND_NOTICE_SECS` - Notice display window (default: 5)
    /// - `OUTBOUND_PREFS_PATH` - Preference file (default: in-memory)
    pub fn from_env() -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(secs) = seconds("OUTBOUND_REFRESH_SECS")? {
            if secs == 0 {
                return Err(SettingsError::Invalid {
                    name: "OUTBOUND_REFRESH_SECS",
                    reason: "must be at least 1".to_string(),
                });
            }
            settings.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = seconds("OUTBOUND_NOTICE_SECS")? {
            settings.notice_window = Duration::from_secs(secs);
        }
        settings.preferences_path = env::var("OUTBOUND_PREFS_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(settings)
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_notice_window(mut self, window: Duration) -> Self {
        self.notice_window = window;
        self
    }

    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }

    pub fn with_zone(mut self, zone: InputZone) -> Self {
        self.zone = zone;
        self
    }
}

fn seconds(name: &'static str) -> Result<Option<u64>, SettingsError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SettingsError::Invalid {
                name,
                reason: format!("expected whole seconds, got {:?}", raw),
            }),
        Err(_) => Ok(None),
    }
}
