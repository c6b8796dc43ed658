//! One backup cycle: back up, report, deliver, sweep

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::app::options::AppOptions;
use crate::backup::artifact::ArtifactWriter;
use crate::backup::orchestrator::BackupOrchestrator;
use crate::backup::protocol::CommandProtocol;
use crate::errors::BackupError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::backup::{BackupResult, RunOutcome, RunStatus};
use crate::notify::aggregator::{device_message, summarize, test_message};
use crate::notify::telegram::Notifier;
use crate::retention::sweeper::RetentionSweeper;
use crate::ssh::session::SessionConnector;
use crate::storage::registry::DeviceRegistry;
use crate::workers::scheduler::CycleRunner;

pub struct BackupCycle {
    registry_file: File,
    orchestrator: BackupOrchestrator,
    sweeper: RetentionSweeper,
    notifier: Option<Arc<dyn Notifier>>,
}

impl BackupCycle {
    pub fn new(
        registry_file: File,
        orchestrator: BackupOrchestrator,
        sweeper: RetentionSweeper,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            registry_file,
            orchestrator,
            sweeper,
            notifier,
        }
    }

    pub fn from_options(
        options: &AppOptions,
        connector: Arc<dyn SessionConnector>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let orchestrator = BackupOrchestrator::new(
            connector,
            CommandProtocol::new(options.settle_delay),
            ArtifactWriter::new(Dir::new(&options.backup_dir)),
            options.orchestrator.clone(),
        );

        Self::new(
            File::new(&options.devices_file),
            orchestrator,
            RetentionSweeper::new(options.retention_days),
            notifier,
        )
    }

    pub async fn load_registry(&self) -> Result<DeviceRegistry, BackupError> {
        DeviceRegistry::load(&self.registry_file).await
    }

    /// Load the registry and run a full cycle over it.
    ///
    /// Only a registry failure is returned; it aborts before any device work
    /// or sweep.
    pub async fn run_cycle(&self) -> Result<RunOutcome, BackupError> {
        let registry = self.load_registry().await?;
        Ok(self.run_with_registry(&registry).await)
    }

    pub async fn run_with_registry(&self, registry: &DeviceRegistry) -> RunOutcome {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, "Starting backup run");

        let summary = self.orchestrator.backup_all(registry).await;
        let report = summarize(&summary);
        info!(run_id = %run_id, "Backup report:\n{}", report);

        let notified = match summary.status() {
            RunStatus::Empty => {
                debug!("No devices processed, skipping notification");
                false
            }
            _ => self.deliver(&report).await,
        };

        let removed_artifacts = match self.sweeper.sweep(self.orchestrator.writer().dir()).await {
            Ok(removed) => removed,
            Err(e) => {
                error!("Retention sweep failed: {}", e);
                0
            }
        };

        RunOutcome {
            run_id,
            started_at: summary.started_at,
            finished_at: Local::now(),
            status: summary.status(),
            success_count: summary.success_count,
            failure_count: summary.failure_count,
            removed_artifacts,
            notified,
            report,
        }
    }

    /// Back up a single named device and send its individual message
    pub async fn run_device(&self, name: &str) -> Result<BackupResult, BackupError> {
        let registry = self.load_registry().await?;
        let device = registry.find(name).ok_or_else(|| {
            BackupError::ConfigError(format!(
                "Device '{}' not found in {}",
                name,
                self.registry_file.path().display()
            ))
        })?;

        let result = self.orchestrator.backup_one(device).await;
        self.deliver(&device_message(&result, &device.host, &Local::now()))
            .await;
        Ok(result)
    }

    pub async fn send_test_notification(&self) -> Result<(), BackupError> {
        let notifier = self.notifier.as_ref().ok_or_else(|| {
            BackupError::ConfigError(
                "Telegram is not configured (TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID)".to_string(),
            )
        })?;

        notifier.send_message(&test_message(&Local::now())).await?;
        info!("Test notification sent");
        Ok(())
    }

    /// Delivery failures are logged, never propagated
    async fn deliver(&self, message: &str) -> bool {
        let Some(notifier) = &self.notifier else {
            debug!("Telegram not configured, skipping notification");
            return false;
        };

        match notifier.send_message(message).await {
            Ok(()) => {
                info!("Telegram notification sent");
                true
            }
            Err(e) => {
                error!("Failed to send Telegram notification: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl CycleRunner for BackupCycle {
    async fn run_cycle(&self) -> Result<RunOutcome, BackupError> {
        BackupCycle::run_cycle(self).await
    }
}
