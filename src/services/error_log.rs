//! Bounded error log and process-wide panic capture

use std::{backtrace::Backtrace, fmt};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Entries kept under the `errors` key
pub const MAX_ERROR_RECORDS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Store read failed at startup
    StateLoadFailed,
    /// A background task finished with an error
    UnhandledRejection,
    /// A panic anywhere in the process
    UncaughtException,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::StateLoadFailed => "STATE_LOAD_FAILED",
            ErrorKind::UnhandledRejection => "UNHANDLED_REJECTION",
            ErrorKind::UncaughtException => "UNCAUGHT_EXCEPTION",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Append `record`, keeping only the newest [`MAX_ERROR_RECORDS`]
pub fn push_bounded(records: &mut Vec<ErrorRecord>, record: ErrorRecord) {
    records.push(record);
    if records.len() > MAX_ERROR_RECORDS {
        let excess = records.len() - MAX_ERROR_RECORDS;
        records.drain(..excess);
    }
}

/// Route panics into `tx` as [`ErrorKind::UncaughtException`] records while
/// keeping the default panic output.
pub fn install_panic_hook(tx: mpsc::UnboundedSender<ErrorRecord>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = match info.payload().downcast_ref::<&str>() {
            Some(s) => s.to_string(),
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => s.clone(),
                None => "panic with non-string payload".to_string(),
            },
        };
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        let stack = Some(match location {
            Some(location) => format!("at {}\n{}", location, Backtrace::capture()),
            None => Backtrace::capture().to_string(),
        });

        let _ = tx.send(ErrorRecord::new(ErrorKind::UncaughtException, message, stack));
        default_hook(info);
    }));
}
