//! Reminder lifecycle phase

use serde::{Deserialize, Serialize};

/// Where the background is in the reminder cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ReminderPhase {
    /// Feature turned off, no live alarm
    Disabled,
    /// Alarm armed, waiting for it to fire
    Armed,
    /// Show signal broadcast, waiting for the page outcome
    Reminding { session: u64 },
}

impl ReminderPhase {
    /// The reminding session, if any
    pub fn session(&self) -> Option<u64> {
        match self {
            ReminderPhase::Reminding { session } => Some(*session),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderPhase::Disabled => "disabled",
            ReminderPhase::Armed => "armed",
            ReminderPhase::Reminding { .. } => "reminding",
        }
    }
}
