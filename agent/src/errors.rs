//! Error types for the backup agent

use thiserror::Error;

/// Main error type for the backup agent
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("SSH error: {0}")]
    SshError(#[from] russh::Error),

    /// Missing or invalid registry, settings or schedule expression
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Could not open a session to a device
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A command failed under the command success policy
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// An artifact could not be persisted
    #[error("Write error: {0}")]
    WriteError(String),

    /// A device descriptor is missing a required field
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Notification error: {0}")]
    NotificationError(String),

    #[error("Sweep error: {0}")]
    SweepError(String),

    #[error("Schedule error: {0}")]
    ScheduleError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackupError {
    /// Whether this error must stop the responsible process
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackupError::ConfigError(_))
    }
}
