//! Entry points for each run mode

use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use colored::Colorize;
use tracing::{error, info, warn};

use crate::app::cycle::BackupCycle;
use crate::app::options::AppOptions;
use crate::errors::BackupError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::notify::telegram::{Notifier, TelegramNotifier};
use crate::schedule::audit::AuditLog;
use crate::schedule::cron::ScheduleState;
use crate::ssh::client::SshConnector;
use crate::storage::registry::DeviceRegistry;
use crate::storage::settings::TelegramSettings;
use crate::workers::scheduler;

/// Run a single backup cycle, stopping early on the shutdown signal
pub async fn run_once(
    mut options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BackupError> {
    ensure_dirs(&options).await?;
    let cycle = init_cycle(&mut options)?;

    tokio::select! {
        _ = shutdown_signal => {
            warn!("Shutdown signal received, backup run interrupted");
            Ok(())
        }
        outcome = cycle.run_cycle() => {
            let outcome = outcome?;
            info!(
                run_id = %outcome.run_id,
                "Backup run finished: {} ({} ok, {} failed, {} old files removed)",
                outcome.status.as_str(),
                outcome.success_count,
                outcome.failure_count,
                outcome.removed_artifacts
            );
            Ok(())
        }
    }
}

/// Back up one device by name
pub async fn run_device(mut options: AppOptions, name: &str) -> Result<(), BackupError> {
    ensure_dirs(&options).await?;
    let cycle = init_cycle(&mut options)?;

    let result = cycle.run_device(name).await?;
    match result.error {
        None => Ok(()),
        Some(e) => Err(BackupError::ExecutionError(format!(
            "Backup of '{}' failed: {}",
            result.device_name, e
        ))),
    }
}

/// Load the registry and print the validation status of every device
pub async fn check_registry(options: &AppOptions) -> Result<(), BackupError> {
    let registry_file = File::new(&options.devices_file);
    println!("Device registry: {}", registry_file.path().display());

    let registry = match DeviceRegistry::load(&registry_file).await {
        Ok(registry) => registry,
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            return Err(e);
        }
    };

    if registry.is_empty() {
        println!("{} No devices configured", "!".yellow());
        return Ok(());
    }

    let mut invalid = 0;
    for device in registry.devices() {
        match device.validate() {
            Ok(()) => println!(
                "{} {} ({}:{}, vdom {})",
                "✓".green(),
                device.name.bold(),
                device.host,
                device.port,
                device.vdom
            ),
            Err(e) => {
                invalid += 1;
                println!("{} {}: {}", "✗".red(), device.display_name().bold(), e);
            }
        }
    }

    println!(
        "{} devices, {} valid, {} invalid",
        registry.len(),
        registry.len() - invalid,
        invalid
    );

    if invalid > 0 {
        return Err(BackupError::ValidationError(format!(
            "{} of {} devices are invalid",
            invalid,
            registry.len()
        )));
    }
    Ok(())
}

/// Send the test message through the configured channel
pub async fn test_notification(mut options: AppOptions) -> Result<(), BackupError> {
    let cycle = init_cycle(&mut options)?;
    cycle.send_test_notification().await
}

/// Run the cron scheduler until the shutdown signal resolves
pub async fn run_scheduler(
    mut options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BackupError> {
    let mut schedule = ScheduleState::parse(options.require_cron_schedule()?)?;

    ensure_dirs(&options).await?;
    let audit = AuditLog::in_dir(&Dir::new(&options.log_dir));
    let cycle = Arc::new(init_cycle(&mut options)?);

    info!(
        "Scheduler mode, audit log at {}",
        audit.file().path().display()
    );
    info!("Scheduler started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    scheduler::run(
        &options.scheduler,
        &mut schedule,
        cycle,
        &audit,
        Local::now,
        tokio::time::sleep,
        Box::pin(shutdown_signal),
    )
    .await;

    Ok(())
}

// =============================== INITIALIZATION ================================== //

fn init_cycle(options: &mut AppOptions) -> Result<BackupCycle, BackupError> {
    let notifier = init_notifier(options.telegram.take())?;
    Ok(BackupCycle::from_options(
        options,
        Arc::new(SshConnector::new()),
        notifier,
    ))
}

fn init_notifier(
    telegram: Option<TelegramSettings>,
) -> Result<Option<Arc<dyn Notifier>>, BackupError> {
    match telegram {
        Some(telegram) => {
            let notifier: Arc<dyn Notifier> =
                Arc::new(TelegramNotifier::new(telegram.bot_token, telegram.chat_id)?);
            Ok(Some(notifier))
        }
        None => {
            info!("Telegram not configured, notifications disabled");
            Ok(None)
        }
    }
}

async fn ensure_dirs(options: &AppOptions) -> Result<(), BackupError> {
    for path in [&options.backup_dir, &options.log_dir] {
        let dir = Dir::new(path);
        if dir.exists().await {
            continue;
        }
        if let Err(e) = dir.create().await {
            error!("Unable to create {}: {}", path.display(), e);
            return Err(e);
        }
    }
    Ok(())
}
