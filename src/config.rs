//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "eye-break")]
#[command(about = "A local daemon that reminds you to rest your eyes")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20520")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Path of the JSON store (defaults to ~/.local/share/eye-break/store.json)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Keep state in memory only
    #[arg(long, conflicts_with = "store")]
    pub ephemeral: bool,

    /// Show reminders in this terminal; press Enter to confirm a break
    #[arg(short, long)]
    pub console: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Resolve where the store lives
    pub fn store_path(&self) -> PathBuf {
        self.store.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("eye-break")
                .join("store.json")
        })
    }
}
