//! Eye Break - a local daemon that reminds you to rest your eyes
//!
//! This library provides the reminder lifecycle: a single recurring alarm,
//! an orchestrator that turns firings into break sessions on connected
//! pages, a page-side notifier with a one-second countdown, and daily usage
//! statistics kept in a flat key-value store.

pub mod api;
pub mod config;
pub mod error;
pub mod messages;
pub mod notifier;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{Error, Result};
pub use messages::{Message, PageSignal, Reply};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
