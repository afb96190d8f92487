//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{services::pages::PageInfo, state::ReminderSnapshot};

/// API response structure for state change endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub state: ReminderSnapshot,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: String, state: ReminderSnapshot) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            state,
        }
    }

    /// Response describing the current enabled flag
    pub fn from_state(message: String, state: ReminderSnapshot) -> Self {
        let status = if state.is_enabled { "enabled" } else { "disabled" };
        Self::new(status, message, state)
    }
}

/// Status response with server metadata
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub state: ReminderSnapshot,
    pub pages: Vec<PageInfo>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
