//! Cron-driven backup scheduler worker

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{error, info};

use crate::errors::BackupError;
use crate::models::backup::RunOutcome;
use crate::schedule::audit::{AuditEntry, AuditLog};
use crate::schedule::cron::ScheduleState;

/// Scheduler worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// How often to check whether the next run is due
    pub poll_interval: Duration,

    /// Wait after an in-loop error before retrying
    pub error_backoff: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            error_backoff: Duration::from_secs(60),
        }
    }
}

/// One orchestration cycle, triggered by the scheduler
#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
    async fn run_cycle(&self) -> Result<RunOutcome, BackupError>;
}

/// Run the scheduler worker until the shutdown signal resolves
pub async fn run<C, N, S, F>(
    options: &Options,
    schedule: &mut ScheduleState,
    runner: Arc<C>,
    audit: &AuditLog,
    now_fn: N,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    C: CycleRunner,
    N: Fn() -> DateTime<Local>,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Scheduler started with schedule: {}", schedule.expression());

    loop {
        let result = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Scheduler interrupted, shutting down...");
                return;
            }
            result = run_iteration(options, schedule, &runner, audit, &now_fn, &sleep_fn) => result,
        };

        if let Err(e) = result {
            error!("Scheduler error: {}", e);
            tokio::select! {
                _ = &mut shutdown_signal => {
                    info!("Scheduler interrupted, shutting down...");
                    return;
                }
                _ = sleep_fn(options.error_backoff) => {}
            }
        }
    }
}

/// Wait for the next fire time, trigger one cycle and audit it
pub async fn run_iteration<C, N, S, F>(
    options: &Options,
    schedule: &mut ScheduleState,
    runner: &Arc<C>,
    audit: &AuditLog,
    now_fn: &N,
    sleep_fn: &S,
) -> Result<AuditEntry, BackupError>
where
    C: CycleRunner,
    N: Fn() -> DateTime<Local>,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    // Computed from the current time, so an overrunning backup delays the
    // following slot instead of queueing missed ones
    let next = schedule.advance(&now_fn())?;
    info!("Next run: {}", next.format("%Y-%m-%d %H:%M:%S"));

    wait_until(next, options.poll_interval, now_fn, sleep_fn).await;

    let entry = trigger(runner.clone()).await;
    audit.record(&entry).await?;
    Ok(entry)
}

/// Sleep in `poll_interval` steps until `now_fn() >= target`
pub async fn wait_until<N, S, F>(target: DateTime<Local>, poll_interval: Duration, now_fn: &N, sleep_fn: &S)
where
    N: Fn() -> DateTime<Local>,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    while now_fn() < target {
        sleep_fn(poll_interval).await;
    }
}

/// Run one cycle on its own task. A panic is reported as a failed entry.
pub async fn trigger<C: CycleRunner>(runner: Arc<C>) -> AuditEntry {
    info!("Starting scheduled backup");

    let handle = tokio::spawn(async move { runner.run_cycle().await });

    match handle.await {
        Ok(Ok(outcome)) => {
            info!(
                run_id = %outcome.run_id,
                "Scheduled backup finished: {}",
                outcome.status.as_str()
            );
            AuditEntry::from_outcome(&outcome)
        }
        Ok(Err(e)) => {
            error!("Scheduled backup failed: {}", e);
            AuditEntry::from_error(Local::now(), e.to_string())
        }
        Err(e) => {
            error!("Scheduled backup aborted: {}", e);
            AuditEntry::from_error(Local::now(), format!("Backup task aborted: {}", e))
        }
    }
}
