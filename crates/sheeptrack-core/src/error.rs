//! Core error types for sheeptrack-core.
//!
//! This module defines the error hierarchy using thiserror. Tracker errors
//! are local, recoverable conditions meant to be reported back to whoever
//! issued the action; storage and config errors wrap their underlying causes.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for sheeptrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Heart state machine errors
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the goal tracker when an action cannot be applied.
///
/// A rejected action never leaves partial state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Action attempted on a goal that is already completed
    #[error("cannot {action} goal {index}: goal is already completed")]
    InvalidTransition { index: usize, action: &'static str },

    /// Index does not refer to a tracked goal
    #[error("no tracked goal at index {index} ({len} tracked)")]
    UnknownIndex { index: usize, len: usize },

    /// Completion refused because the pet has no hearts left
    #[error("cannot complete goal {index} while its sheep has no hearts")]
    CompletionBlocked { index: usize },
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Record lookup found nothing
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Live goal cap reached
    #[error("user {user_id} already has {live} live goals (limit {limit})")]
    CapacityExceeded { user_id: i64, live: usize, limit: usize },

    /// Blank goal text or user name
    #[error("{0} must not be empty")]
    EmptyText(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if matches!(
                    inner.code,
                    rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
                ) {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
