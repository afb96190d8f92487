//! Error types shared across the crate

use std::path::PathBuf;

/// Errors produced by the store, the orchestrator and message handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing the store file failed.
    #[error("store I/O error at {path}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be encoded or decoded.
    #[error("store value for `{key}` is malformed: {source}")]
    StoreFormat {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store refused the operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Settings outside the accepted ranges.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A mutex guarding shared state was poisoned.
    #[error("failed to lock {0}")]
    Lock(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
