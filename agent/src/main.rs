//! FortiVault - Entry Point
//!
//! Backs up FortiGate configurations over SSH, once or on a cron schedule.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::Context;
use fortivault::app::options::AppOptions;
use fortivault::app::run::{check_registry, run_device, run_once, run_scheduler, test_notification};
use fortivault::logs::{init_logging, LogOptions};
use fortivault::storage::settings::Settings;
use fortivault::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    // Settings come from the environment and an optional .env file
    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    if let Some(path) = cli_args.get("devices") {
        settings.devices_file = PathBuf::from(path);
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        log_to_file: settings.log_to_file,
        log_dir: settings.log_dir.clone(),
        json_format: settings.log_json,
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    let options = AppOptions::from_settings(settings);
    info!("FortiVault {} ({})", version.version, version.git_hash);

    if let Err(e) = dispatch(&cli_args, options).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn dispatch(cli_args: &HashMap<String, String>, options: AppOptions) -> anyhow::Result<()> {
    if cli_args.contains_key("check") {
        return check_registry(&options)
            .await
            .context("Device registry check failed");
    }

    if cli_args.contains_key("test-notification") {
        return test_notification(options)
            .await
            .context("Test notification failed");
    }

    if let Some(name) = cli_args.get("device") {
        return run_device(options, name)
            .await
            .with_context(|| format!("Backup of device '{}' failed", name));
    }

    if cli_args.contains_key("schedule") {
        info!(
            "Running scheduler: cron '{}', backups in {}, logs in {}",
            options.cron_schedule.as_deref().unwrap_or("<unset>"),
            options.backup_dir.display(),
            options.log_dir.display()
        );
        return run_scheduler(options, await_shutdown_signal())
            .await
            .context("Scheduler failed to start");
    }

    run_once(options, await_shutdown_signal())
        .await
        .context("Backup run failed")
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
