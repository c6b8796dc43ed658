//! Append-only audit log of scheduled runs

use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::errors::BackupError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::backup::{RunOutcome, RunStatus};

pub const AUDIT_LOG_NAME: &str = "cron.log";

/// One triggered run as recorded in the audit log
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub run_id: Option<Uuid>,
    pub at: DateTime<Local>,
    pub ok: bool,
    pub status: Option<RunStatus>,
    pub output: String,
}

impl AuditEntry {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        Self {
            run_id: Some(outcome.run_id),
            at: outcome.finished_at,
            ok: true,
            status: Some(outcome.status),
            output: outcome.report.clone(),
        }
    }

    pub fn from_error(at: DateTime<Local>, error: impl Into<String>) -> Self {
        Self {
            run_id: None,
            at,
            ok: false,
            status: None,
            output: error.into(),
        }
    }

    pub fn render(&self) -> String {
        let run_id = self
            .run_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "\n--- Backup run {} at {} ---\nStatus: {}\nResult: {}\nOutput:\n{}\n{}\n",
            run_id,
            self.at.format("%Y-%m-%d %H:%M:%S"),
            if self.ok { "ok" } else { "error" },
            self.status.map(|s| s.as_str()).unwrap_or("-"),
            self.output,
            "-".repeat(50)
        )
    }
}

/// Audit log file
#[derive(Debug, Clone)]
pub struct AuditLog {
    file: File,
}

impl AuditLog {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// `cron.log` inside the log directory
    pub fn in_dir(log_dir: &Dir) -> Self {
        Self::new(log_dir.file(AUDIT_LOG_NAME))
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub async fn record(&self, entry: &AuditEntry) -> Result<(), BackupError> {
        self.file.append_string(&entry.render()).await
    }
}
