//! Age-based artifact cleanup

use std::time::{Duration, SystemTime};

use tracing::{error, info};

use crate::errors::BackupError;
use crate::filesys::dir::Dir;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Deletes backup files older than the retention window
///
/// Every regular file directly inside the directory is considered, whatever
/// device or artifact type produced it.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    retention_days: u64,
}

impl RetentionSweeper {
    pub fn new(retention_days: u64) -> Self {
        Self { retention_days }
    }

    /// Sweep relative to the current time
    pub async fn sweep(&self, dir: &Dir) -> Result<usize, BackupError> {
        self.sweep_at(dir, SystemTime::now()).await
    }

    /// Remove files whose modification time is strictly before `now - retention`.
    ///
    /// Only a failure to list the directory is returned; per-file errors are
    /// logged and the sweep moves on.
    pub async fn sweep_at(&self, dir: &Dir, now: SystemTime) -> Result<usize, BackupError> {
        info!(
            "Starting cleanup of backups older than {} days",
            self.retention_days
        );

        let window = Duration::from_secs(self.retention_days.saturating_mul(SECS_PER_DAY));
        let cutoff = now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH);

        let files = dir.list_files().await.map_err(|e| {
            BackupError::SweepError(format!("Unable to list {}: {}", dir.path().display(), e))
        })?;

        let mut removed = 0;
        for file in files {
            let modified = match file.modified().await {
                Ok(modified) => modified,
                Err(e) => {
                    error!("Unable to stat {}: {}", file.path().display(), e);
                    continue;
                }
            };

            if modified >= cutoff {
                continue;
            }

            match file.delete().await {
                Ok(()) => {
                    removed += 1;
                    info!("Removed file: {}", file.path().display());
                }
                Err(e) => error!("Unable to remove {}: {}", file.path().display(), e),
            }
        }

        info!("Cleanup finished. {} files removed", removed);
        Ok(removed)
    }
}
