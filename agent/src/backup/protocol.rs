//! Command execution policy

use std::time::Duration;

use tracing::{debug, error};

use crate::errors::BackupError;
use crate::models::backup::{CommandOutcome, CommandSpec};
use crate::ssh::session::RemoteSession;

/// Default wait between issuing a command and collecting its result
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Whether a command result counts as success.
///
/// Exit status zero, or any non-blank stdout regardless of status. FortiOS
/// returns non-zero for some commands that still print the requested data.
pub fn is_successful(outcome: &CommandOutcome) -> bool {
    outcome.exit_status == Some(0) || !outcome.stdout.trim().is_empty()
}

/// Runs commands over a session and applies the success policy
#[derive(Debug, Clone)]
pub struct CommandProtocol {
    settle_delay: Duration,
}

impl Default for CommandProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl CommandProtocol {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    /// Execute a command and return its trimmed stdout.
    ///
    /// Returns `ExecutionError` when the outcome fails `is_successful`.
    pub async fn execute(
        &self,
        session: &mut dyn RemoteSession,
        command: &CommandSpec,
        timeout: Duration,
    ) -> Result<String, BackupError> {
        debug!("Executing '{}' ({})", command.command, command.label);

        session.issue(&command.command).await?;

        // Some appliances flush output after the channel reports the command started
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let outcome = session.collect(timeout).await?;

        if is_successful(&outcome) {
            Ok(outcome.stdout.trim().to_string())
        } else {
            error!(
                "Command '{}' failed with status {:?}: {}",
                command.command,
                outcome.exit_status,
                outcome.stderr.trim()
            );
            Err(BackupError::ExecutionError(format!(
                "Command '{}' failed with status {}: {}",
                command.command,
                outcome
                    .exit_status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                outcome.stderr.trim()
            )))
        }
    }
}
