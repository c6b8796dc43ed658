//! Finite State Machine for a single device backup

use serde::{Deserialize, Serialize};

use crate::errors::BackupError;

/// Backup stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStage {
    /// Not started
    Pending,

    /// Checking the device descriptor
    Validating,

    /// Opening the remote session
    Connecting,

    /// Running the configuration command
    Executing,

    /// Persisting the configuration artifact
    Writing,

    /// Running the optional diagnostic commands
    CollectingSystemInfo,

    /// Releasing the remote session
    Closing,

    /// Terminal: artifacts written
    Succeeded,

    /// Terminal: no artifacts for this device
    Failed,
}

impl BackupStage {
    /// Whether a remote session is open in this stage
    pub fn holds_session(&self) -> bool {
        matches!(
            self,
            BackupStage::Executing | BackupStage::Writing | BackupStage::CollectingSystemInfo
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BackupStage::Succeeded | BackupStage::Failed)
    }
}

/// Backup event
#[derive(Debug, Clone)]
pub enum BackupEvent {
    /// Begin validation
    Start,

    /// Descriptor is complete
    Validated,

    /// Session opened
    Connected,

    /// Configuration command produced output
    Executed,

    /// Configuration artifact written
    Written,

    /// Diagnostics collected (or skipped)
    SystemInfoDone,

    /// Session released
    Closed,

    /// The current stage failed
    Fail(String),
}

/// Device backup FSM
///
/// A failure while a session is open moves to `Closing` so the session is
/// always released before the device reaches `Failed`.
#[derive(Debug, Clone)]
pub struct BackupFsm {
    stage: BackupStage,
    error: Option<String>,
    failed_at: Option<BackupStage>,
}

impl BackupFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            stage: BackupStage::Pending,
            error: None,
            failed_at: None,
        }
    }

    /// Get current stage
    pub fn stage(&self) -> BackupStage {
        self.stage
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Stage in which the failure happened
    pub fn failed_at(&self) -> Option<BackupStage> {
        self.failed_at
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: BackupEvent) -> Result<(), BackupError> {
        let new_stage = match (self.stage, &event) {
            (BackupStage::Pending, BackupEvent::Start) => BackupStage::Validating,
            (BackupStage::Validating, BackupEvent::Validated) => BackupStage::Connecting,
            (BackupStage::Connecting, BackupEvent::Connected) => BackupStage::Executing,
            (BackupStage::Executing, BackupEvent::Executed) => BackupStage::Writing,
            (BackupStage::Writing, BackupEvent::Written) => BackupStage::CollectingSystemInfo,
            (BackupStage::CollectingSystemInfo, BackupEvent::SystemInfoDone) => BackupStage::Closing,

            (BackupStage::Closing, BackupEvent::Closed) => {
                if self.error.is_some() {
                    BackupStage::Failed
                } else {
                    BackupStage::Succeeded
                }
            }

            (stage, BackupEvent::Fail(err)) if !stage.is_terminal() && stage != BackupStage::Closing => {
                self.error = Some(err.clone());
                self.failed_at = Some(stage);
                if stage.holds_session() {
                    BackupStage::Closing
                } else {
                    BackupStage::Failed
                }
            }

            (stage, event) => {
                return Err(BackupError::Internal(format!(
                    "Invalid backup transition: {:?} -> {:?}",
                    stage, event
                )));
            }
        };

        self.stage = new_stage;
        Ok(())
    }
}

impl Default for BackupFsm {
    fn default() -> Self {
        Self::new()
    }
}
