//! Collaborators of the orchestrator
//!
//! The persistent store, the registry of connected pages and the bounded
//! error log.

pub mod error_log;
pub mod pages;
pub mod store;

// Re-export main types
pub use error_log::{ErrorKind, ErrorRecord};
pub use pages::{PageId, PageKind, PageRegistry};
pub use store::{JsonFileStore, MemoryStore, Store};
