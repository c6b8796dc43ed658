//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::backup::orchestrator;
use crate::backup::protocol::DEFAULT_SETTLE_DELAY;
use crate::errors::BackupError;
use crate::storage::settings::{Settings, TelegramSettings};
use crate::workers::scheduler;

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Device registry document
    pub devices_file: PathBuf,

    /// Artifact directory, also swept for retention
    pub backup_dir: PathBuf,

    /// Log directory, holds the scheduler audit log
    pub log_dir: PathBuf,

    /// Per-device backup options
    pub orchestrator: orchestrator::Options,

    /// Pause between issuing a command and reading its output
    pub settle_delay: Duration,

    /// Artifacts older than this many days are deleted after each run
    pub retention_days: u64,

    /// Scheduler worker options
    pub scheduler: scheduler::Options,

    /// Telegram delivery, disabled when absent
    pub telegram: Option<TelegramSettings>,

    /// Cron expression for scheduler mode
    pub cron_schedule: Option<String>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(Settings::default())
    }
}

impl AppOptions {
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            devices_file: settings.devices_file,
            backup_dir: settings.backup_dir,
            log_dir: settings.log_dir,
            orchestrator: orchestrator::Options {
                default_timeout: Duration::from_secs(settings.ssh_timeout_secs),
                backup_mode: settings.backup_mode,
                collect_system_info: settings.collect_system_info,
            },
            settle_delay: DEFAULT_SETTLE_DELAY,
            retention_days: settings.retention_days,
            scheduler: scheduler::Options::default(),
            telegram: settings.telegram,
            cron_schedule: settings.cron_schedule,
        }
    }

    /// The cron expression, required in scheduler mode
    pub fn require_cron_schedule(&self) -> Result<&str, BackupError> {
        self.cron_schedule
            .as_deref()
            .ok_or_else(|| BackupError::ConfigError("CRON_SCHEDULE is not set".to_string()))
    }
}
