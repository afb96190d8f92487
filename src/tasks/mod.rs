//! Background tasks module
//!
//! This module contains the alarm scheduler and the tasks that run
//! alongside the HTTP server.

pub mod alarm;
pub mod reminder;
pub mod supervisor;

// Re-export main functions
pub use alarm::{AlarmEvent, Scheduler, ALARM_NAME};
pub use reminder::reminder_task;
pub use supervisor::{error_log_task, spawn_supervised};
