//! In-memory sessions and notifiers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fortivault::backup::artifact::ArtifactWriter;
use fortivault::backup::orchestrator::{BackupOrchestrator, Options};
use fortivault::backup::protocol::CommandProtocol;
use fortivault::errors::BackupError;
use fortivault::filesys::dir::Dir;
use fortivault::models::backup::CommandOutcome;
use fortivault::notify::telegram::Notifier;
use fortivault::ssh::session::{RemoteSession, SessionConnector};
use fortivault::storage::registry::Device;

pub const CONFIG_DUMP: &str = "config system global\n    set hostname \"edge\"\nend";
pub const SYSTEM_STATUS: &str = "Version: FortiGate-60F v7.2.5,build1517";

/// Connector whose sessions answer FortiOS commands from fixtures
#[derive(Default)]
pub struct FakeConnector {
    /// Hosts that refuse the connection
    pub refused: Vec<String>,

    /// Hosts whose configuration dump fails with empty output
    pub broken: Vec<String>,

    pub opened: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn opened_hosts(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn open(
        &self,
        device: &Device,
        _timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, BackupError> {
        self.opened.lock().unwrap().push(device.host.clone());

        if self.refused.contains(&device.host) {
            return Err(BackupError::ConnectionError(format!(
                "Failed to connect to {}:{}: connection refused",
                device.host, device.port
            )));
        }

        Ok(Box::new(FakeSession {
            broken: self.broken.contains(&device.host),
            pending: None,
            is_closed: false,
            closed: self.closed.clone(),
        }))
    }
}

pub struct FakeSession {
    broken: bool,
    pending: Option<String>,
    is_closed: bool,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn issue(&mut self, command: &str) -> Result<(), BackupError> {
        if self.is_closed {
            return Err(BackupError::ConnectionError("session closed".to_string()));
        }
        self.pending = Some(command.to_string());
        Ok(())
    }

    async fn collect(&mut self, _timeout: Duration) -> Result<CommandOutcome, BackupError> {
        let command = self
            .pending
            .take()
            .ok_or_else(|| BackupError::ExecutionError("no command issued".to_string()))?;

        let outcome = match command.as_str() {
            "show full-configuration" if self.broken => CommandOutcome {
                exit_status: Some(1),
                stdout: String::new(),
                stderr: "Command fail. Return code -61".to_string(),
            },
            "show full-configuration" => CommandOutcome {
                exit_status: Some(0),
                stdout: format!("{}\n", CONFIG_DUMP),
                stderr: String::new(),
            },
            "get system status" => CommandOutcome {
                exit_status: Some(0),
                stdout: SYSTEM_STATUS.to_string(),
                stderr: String::new(),
            },
            // Advisory non-zero status with output still counts
            "get system ha status" => CommandOutcome {
                exit_status: Some(3),
                stdout: "HA Health Status: OK".to_string(),
                stderr: String::new(),
            },
            _ => CommandOutcome {
                exit_status: Some(3),
                stdout: String::new(),
                stderr: "Unknown action 0".to_string(),
            },
        };
        Ok(outcome)
    }

    async fn close(&mut self) {
        if !self.is_closed {
            self.is_closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Notifier that records messages, optionally failing every delivery
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, text: &str) -> Result<(), BackupError> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(BackupError::NotificationError("502 Bad Gateway".to_string()));
        }
        Ok(())
    }
}

/// Orchestrator over a fake connector with no settle delay
pub fn orchestrator(connector: Arc<FakeConnector>, backup_dir: &std::path::Path) -> BackupOrchestrator {
    BackupOrchestrator::new(
        connector,
        CommandProtocol::new(Duration::ZERO),
        ArtifactWriter::new(Dir::new(backup_dir)),
        Options::default(),
    )
}
