//! Cron schedule and audit log

pub mod audit;
pub mod cron;
