//! Inter-context message protocol
//!
//! Every message is a JSON object tagged by its `action` field. Pages and
//! the HTTP API send [`Message`]s to the background; the background sends
//! [`PageSignal`]s to pages. Each handled message is answered with a
//! [`Reply`].

use serde::{Deserialize, Serialize};

use crate::state::{Settings, SettingsPatch};

/// Requests handled by the background dispatch table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// Turn reminders on or off
    ToggleEnable { status: bool },
    /// The user confirmed the break
    RestartTimer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<u64>,
    },
    /// The countdown ran out without confirmation
    SkipTimer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<u64>,
    },
    /// Save new settings and re-arm the alarm
    UpdateSettings { settings: SettingsPatch },
    /// Free-form diagnostics from a page
    Log { log: serde_json::Value },
}

impl Message {
    pub fn action(&self) -> &'static str {
        match self {
            Message::ToggleEnable { .. } => "toggleEnable",
            Message::RestartTimer { .. } => "restartTimer",
            Message::SkipTimer { .. } => "skipTimer",
            Message::UpdateSettings { .. } => "updateSettings",
            Message::Log { .. } => "log",
        }
    }
}

/// Signals pushed from the background to pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageSignal {
    /// Start a break session
    ShowReminder {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<u64>,
    },
    /// Settings changed; refresh what the overlay shows
    SettingsUpdated { settings: Settings },
}

/// Answer to every handled [`Message`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
