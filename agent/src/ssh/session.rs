//! Remote session traits
//!
//! The orchestrator only sees these traits; `ssh::client` provides the russh
//! implementation and tests provide in-memory ones.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::BackupError;
use crate::models::backup::CommandOutcome;
use crate::storage::registry::Device;

/// One authenticated command channel to a single device
#[async_trait]
pub trait RemoteSession: Send {
    /// Start a command without waiting for its output
    async fn issue(&mut self, command: &str) -> Result<(), BackupError>;

    /// Wait for the issued command to finish and collect its output
    async fn collect(&mut self, timeout: Duration) -> Result<CommandOutcome, BackupError>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self);
}

/// Opens sessions to devices
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn open(
        &self,
        device: &Device,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, BackupError>;
}
