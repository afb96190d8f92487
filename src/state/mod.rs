//! State management module
//!
//! This module contains the persisted reminder state and the orchestrator
//! that drives the reminder cycle.

pub mod app_state;
pub mod lifecycle;
pub mod settings;
pub mod stats;

// Re-export main types
pub use app_state::{AppState, BreakOutcome, OutcomeDisposition, ReminderSnapshot};
pub use lifecycle::ReminderPhase;
pub use settings::{Settings, SettingsPatch};
pub use stats::{StatField, Stats};
