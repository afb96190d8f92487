//! Reminder timing settings

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default minutes between reminders
pub const DEFAULT_INTERVAL_MINUTES: u32 = 20;
/// Default break length in seconds
pub const DEFAULT_BREAK_SECONDS: u32 = 20;

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 180;
pub const MIN_BREAK_SECONDS: u32 = 5;
pub const MAX_BREAK_SECONDS: u32 = 300;

/// Persisted under the `settings` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Minutes between two reminders
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Seconds the overlay counts down
    #[serde(default = "default_break_duration")]
    pub break_duration: u32,
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_break_duration() -> u32 {
    DEFAULT_BREAK_SECONDS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_MINUTES,
            break_duration: DEFAULT_BREAK_SECONDS,
        }
    }
}

impl Settings {
    /// Check the user-facing ranges (interval 1-180 minutes, break 5-300 seconds)
    pub fn validate(&self) -> Result<()> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&self.interval) {
            return Err(Error::InvalidSettings(format!(
                "interval must be between {} and {} minutes, got {}",
                MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES, self.interval
            )));
        }
        if !(MIN_BREAK_SECONDS..=MAX_BREAK_SECONDS).contains(&self.break_duration) {
            return Err(Error::InvalidSettings(format!(
                "breakDuration must be between {} and {} seconds, got {}",
                MIN_BREAK_SECONDS, MAX_BREAK_SECONDS, self.break_duration
            )));
        }
        Ok(())
    }

    /// Repair values read back from the store so timers stay usable.
    pub fn sanitized(self) -> Self {
        Self {
            interval: self.interval.max(MIN_INTERVAL_MINUTES),
            break_duration: self.break_duration.max(MIN_BREAK_SECONDS),
        }
    }

    /// Merge the fields present in `patch` over these settings
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            interval: patch.interval.unwrap_or(self.interval),
            break_duration: patch.break_duration.unwrap_or(self.break_duration),
        }
    }
}

/// Partial settings as sent by `updateSettings`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_duration: Option<u32>,
}

impl From<Settings> for SettingsPatch {
    fn from(settings: Settings) -> Self {
        Self {
            interval: Some(settings.interval),
            break_duration: Some(settings.break_duration),
        }
    }
}
