//! Backup run models

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BackupError;

/// How the configuration is pulled off the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    /// `show full-configuration`, captured from stdout
    #[default]
    Text,

    /// `execute backup config flash ...`
    Binary,
}

impl BackupMode {
    /// Command that produces the configuration dump for this mode
    pub fn config_command(&self, timestamp: &str) -> CommandSpec {
        match self {
            BackupMode::Text => CommandSpec::new("full_configuration", "show full-configuration"),
            BackupMode::Binary => CommandSpec::new(
                "flash_backup",
                format!("execute backup config flash backup_{}.conf", timestamp),
            ),
        }
    }
}

impl FromStr for BackupMode {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(BackupMode::Text),
            "binary" => Ok(BackupMode::Binary),
            other => Err(BackupError::ConfigError(format!(
                "Invalid backup format '{}', expected 'text' or 'binary'",
                other
            ))),
        }
    }
}

/// A command plus the label it is reported under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub label: String,
    pub command: String,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }
}

/// Diagnostic commands collected into the system-info artifact, in output order
pub fn system_info_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("system_status", "get system status"),
        CommandSpec::new("system_performance", "get system performance status"),
        CommandSpec::new("interface_status", "get system interface"),
        CommandSpec::new("routing_table", "get router info routing-table all"),
        CommandSpec::new("arp_table", "get system arp"),
        CommandSpec::new("session_list", "get system session list"),
        CommandSpec::new("ha_status", "get system ha status"),
        CommandSpec::new("license_info", "get system status | grep License"),
    ]
}

/// Raw result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit status, if the remote side reported one
    pub exit_status: Option<u32>,
    pub stdout: String,
    pub stderr: String,
}

/// Terminal outcome of one device backup
#[derive(Debug, Clone, Serialize)]
pub struct BackupResult {
    pub device_name: String,
    pub success: bool,
    /// Files written by this run
    pub artifacts: Vec<PathBuf>,
    /// Config artifacts for this device now in the backup directory
    pub retained_configs: usize,
    pub error: Option<String>,
}

impl BackupResult {
    pub fn succeeded(device_name: impl Into<String>, artifacts: Vec<PathBuf>) -> Self {
        let retained_configs = artifacts
            .iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == "conf"))
            .count();
        Self {
            device_name: device_name.into(),
            success: true,
            artifacts,
            retained_configs,
            error: None,
        }
    }

    pub fn with_retained_configs(mut self, count: usize) -> Self {
        self.retained_configs = count;
        self
    }

    pub fn failed(device_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            success: false,
            artifacts: Vec::new(),
            retained_configs: 0,
            error: Some(error.into()),
        }
    }
}

/// Aggregate state of a run, derived from its counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every device succeeded
    Success,

    /// At least one success and at least one failure
    Partial,

    /// No device succeeded
    Failure,

    /// The registry was empty
    Empty,
}

impl RunStatus {
    pub fn from_counts(success_count: usize, failure_count: usize) -> Self {
        match (success_count, failure_count) {
            (0, 0) => RunStatus::Empty,
            (_, 0) => RunStatus::Success,
            (0, _) => RunStatus::Failure,
            _ => RunStatus::Partial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failure => "failure",
            RunStatus::Empty => "empty",
        }
    }
}

/// Results of one orchestration pass over the registry
///
/// Results are keyed by device name. A later result for a name already present
/// replaces the earlier one in place; the counters still count every device
/// processed.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    results: Vec<BackupResult>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl RunSummary {
    /// Start a summary at the given time
    pub fn start(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            results: Vec::new(),
            success_count: 0,
            failure_count: 0,
        }
    }

    /// Record one device outcome
    pub fn record(&mut self, result: BackupResult) {
        if result.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }

        match self
            .results
            .iter_mut()
            .find(|r| r.device_name == result.device_name)
        {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    /// Close the summary
    pub fn finish(&mut self, finished_at: DateTime<Local>) {
        self.finished_at = finished_at;
    }

    pub fn get(&self, device_name: &str) -> Option<&BackupResult> {
        self.results.iter().find(|r| r.device_name == device_name)
    }

    /// Results in first-seen order
    pub fn results(&self) -> &[BackupResult] {
        &self.results
    }

    pub fn successful(&self) -> impl Iterator<Item = &BackupResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BackupResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Number of devices processed, duplicates included
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::from_counts(self.success_count, self.failure_count)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Structured outcome of one scheduled or one-shot cycle
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub status: RunStatus,
    pub success_count: usize,
    pub failure_count: usize,
    pub removed_artifacts: usize,
    pub notified: bool,

    /// Operator message, also written to the audit log
    pub report: String,
}
