//! Backup orchestration across the device registry

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::backup::artifact::{artifact_timestamp, ArtifactWriter};
use crate::backup::fsm::{BackupEvent, BackupFsm};
use crate::backup::protocol::CommandProtocol;
use crate::errors::BackupError;
use crate::models::backup::{system_info_commands, BackupMode, BackupResult, RunSummary};
use crate::ssh::session::{RemoteSession, SessionConnector};
use crate::storage::registry::{Device, DeviceRegistry};

/// Orchestrator options
#[derive(Debug, Clone)]
pub struct Options {
    /// Connect/command timeout when the device has no override
    pub default_timeout: Duration,

    /// Text or binary configuration dump
    pub backup_mode: BackupMode,

    /// Collect the system-info artifact
    pub collect_system_info: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            backup_mode: BackupMode::Text,
            collect_system_info: true,
        }
    }
}

/// Backs up devices one at a time, isolating each device's failure
pub struct BackupOrchestrator {
    connector: Arc<dyn SessionConnector>,
    protocol: CommandProtocol,
    writer: ArtifactWriter,
    options: Options,
}

impl BackupOrchestrator {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        protocol: CommandProtocol,
        writer: ArtifactWriter,
        options: Options,
    ) -> Self {
        Self {
            connector,
            protocol,
            writer,
            options,
        }
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    /// Back up every device in registry order
    pub async fn backup_all(&self, registry: &DeviceRegistry) -> RunSummary {
        let mut summary = RunSummary::start(Local::now());
        info!("Starting backup of {} FortiGate devices", registry.len());

        if registry.is_empty() {
            warn!("No devices configured for backup");
            summary.finish(Local::now());
            return summary;
        }

        for device in registry.devices() {
            let result = self.backup_one(device).await;
            summary.record(result);
        }

        summary.finish(Local::now());
        info!(
            "Backup finished. Successful: {}/{}",
            summary.success_count,
            summary.total()
        );
        summary
    }

    /// Back up a single device. Never fails; errors become a failed result.
    pub async fn backup_one(&self, device: &Device) -> BackupResult {
        let name = device.display_name().to_string();
        info!("Starting backup of device: {} ({})", name, device.host);

        let mut fsm = BackupFsm::new();
        match self.drive(device, &mut fsm).await {
            Ok(artifacts) => {
                info!("Backup completed successfully: {}", name);
                let result = BackupResult::succeeded(name, artifacts);
                match self.writer.count_configs(&device.name).await {
                    Ok(count) => result.with_retained_configs(count),
                    Err(e) => {
                        warn!("Unable to count backups of {}: {}", device.name, e);
                        result
                    }
                }
            }
            Err(e) => {
                error!(
                    device = %name,
                    stage = ?fsm.failed_at(),
                    "Backup failed: {}",
                    e
                );
                BackupResult::failed(name, e.to_string())
            }
        }
    }

    async fn drive(&self, device: &Device, fsm: &mut BackupFsm) -> Result<Vec<PathBuf>, BackupError> {
        fsm.process(BackupEvent::Start)?;

        if let Err(e) = device.validate() {
            fsm.process(BackupEvent::Fail(e.to_string()))?;
            return Err(e);
        }
        fsm.process(BackupEvent::Validated)?;

        let timeout = device.timeout_or(self.options.default_timeout);
        let mut session = match self.connector.open(device, timeout).await {
            Ok(session) => session,
            Err(e) => {
                fsm.process(BackupEvent::Fail(e.to_string()))?;
                return Err(e);
            }
        };
        fsm.process(BackupEvent::Connected)?;

        let outcome = self.run_session(device, session.as_mut(), timeout, fsm).await;
        let transition = match &outcome {
            Ok(_) => Ok(()),
            Err(e) => fsm.process(BackupEvent::Fail(e.to_string())),
        };

        session.close().await;
        transition?;
        fsm.process(BackupEvent::Closed)?;
        debug!("Session to {} closed", device.name);

        outcome
    }

    async fn run_session(
        &self,
        device: &Device,
        session: &mut dyn RemoteSession,
        timeout: Duration,
        fsm: &mut BackupFsm,
    ) -> Result<Vec<PathBuf>, BackupError> {
        // Shared by both artifacts so they correlate
        let timestamp = artifact_timestamp(&Local::now());

        let command = self.options.backup_mode.config_command(&timestamp);
        info!("Running command: {}", command.command);
        let config = self.protocol.execute(session, &command, timeout).await?;
        if config.is_empty() {
            return Err(BackupError::ExecutionError(format!(
                "Empty configuration received from {}",
                device.name
            )));
        }
        fsm.process(BackupEvent::Executed)?;

        let config_path = self.writer.write_config(device, &timestamp, &config).await?;
        fsm.process(BackupEvent::Written)?;

        let mut artifacts = vec![config_path];
        if self.options.collect_system_info {
            if let Some(path) = self
                .collect_system_info(device, session, &timestamp, timeout)
                .await
            {
                artifacts.push(path);
            }
        }
        fsm.process(BackupEvent::SystemInfoDone)?;

        Ok(artifacts)
    }

    /// Best effort: failing commands are skipped and write errors only logged
    async fn collect_system_info(
        &self,
        device: &Device,
        session: &mut dyn RemoteSession,
        timestamp: &str,
        timeout: Duration,
    ) -> Option<PathBuf> {
        info!("Collecting system information: {}", device.name);

        let mut sections = Vec::new();
        for command in system_info_commands() {
            match self.protocol.execute(session, &command, timeout).await {
                Ok(output) if !output.is_empty() => sections.push((command.label, output)),
                Ok(_) => debug!("No output for {} on {}", command.label, device.name),
                Err(e) => debug!("Skipping {} on {}: {}", command.label, device.name, e),
            }
        }

        match self.writer.write_system_info(device, timestamp, &sections).await {
            Ok(path) => path,
            Err(e) => {
                error!("Failed to save system information for {}: {}", device.name, e);
                None
            }
        }
    }
}
