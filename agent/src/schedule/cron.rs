//! Cron expression evaluation

use chrono::{DateTime, Local};
use croner::Cron;

use crate::errors::BackupError;

/// Parsed schedule plus the next time it fires
pub struct ScheduleState {
    expression: String,
    cron: Cron,
    next_fire: Option<DateTime<Local>>,
}

impl ScheduleState {
    /// Parse a five-field cron expression
    pub fn parse(expression: &str) -> Result<Self, BackupError> {
        let expression = expression.trim();
        let cron = Cron::new(expression).parse().map_err(|e| {
            BackupError::ConfigError(format!("Invalid cron expression '{}': {}", expression, e))
        })?;

        Ok(Self {
            expression: expression.to_string(),
            cron,
            next_fire: None,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Last computed fire time
    pub fn next_fire(&self) -> Option<DateTime<Local>> {
        self.next_fire
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: &DateTime<Local>) -> Result<DateTime<Local>, BackupError> {
        self.cron.find_next_occurrence(after, false).map_err(|e| {
            BackupError::ScheduleError(format!(
                "No next run for '{}' after {}: {}",
                self.expression, after, e
            ))
        })
    }

    /// Recompute and store the next fire time from `now`
    pub fn advance(&mut self, now: &DateTime<Local>) -> Result<DateTime<Local>, BackupError> {
        let next = self.next_after(now)?;
        self.next_fire = Some(next);
        Ok(next)
    }
}
