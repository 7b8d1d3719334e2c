mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, IntervalConfig, TrackerConfig};
pub use database::{Database, GoalStore, User};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// `SHEEPTRACK_HOME` wins when set. Otherwise `~/.config/sheeptrack[-dev]/`,
/// with the `-dev` suffix selected by `SHEEPTRACK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("SHEEPTRACK_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("SHEEPTRACK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("sheeptrack-dev")
            } else {
                base_dir.join("sheeptrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
