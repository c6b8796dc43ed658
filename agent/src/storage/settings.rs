//! Settings loaded from the environment

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use tracing::warn;

use crate::errors::BackupError;
use crate::logs::LogLevel;
use crate::models::backup::BackupMode;

/// Agent settings
#[derive(Debug)]
pub struct Settings {
    /// Device registry document
    pub devices_file: PathBuf,

    /// Where artifacts are written and swept
    pub backup_dir: PathBuf,

    /// Log files and the scheduler audit log
    pub log_dir: PathBuf,

    /// Artifacts older than this many days are deleted
    pub retention_days: u64,

    /// Default SSH connect/command timeout in seconds
    pub ssh_timeout_secs: u64,

    /// Text or binary configuration dump
    pub backup_mode: BackupMode,

    /// Collect the system-info artifact after the config dump
    pub collect_system_info: bool,

    /// Log level
    pub log_level: LogLevel,

    /// Also log to a daily file under `log_dir`
    pub log_to_file: bool,

    /// `LOG_FORMAT=json` switches stdout to JSON lines
    pub log_json: bool,

    /// Telegram credentials, present only when both values are set
    pub telegram: Option<TelegramSettings>,

    /// Cron expression for scheduler mode
    pub cron_schedule: Option<String>,
}

/// Telegram bot settings
#[derive(Debug)]
pub struct TelegramSettings {
    pub bot_token: SecretString,
    pub chat_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            devices_file: PathBuf::from("config/devices.json"),
            backup_dir: PathBuf::from("/app/backups"),
            log_dir: PathBuf::from("/app/logs"),
            retention_days: 30,
            ssh_timeout_secs: 30,
            backup_mode: BackupMode::Text,
            collect_system_info: true,
            log_level: LogLevel::Info,
            log_to_file: true,
            log_json: false,
            telegram: None,
            cron_schedule: None,
        }
    }
}

impl Settings {
    /// Load settings from the process environment, after an optional `.env`
    pub fn from_env() -> Result<Self, BackupError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BackupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backup_mode = match var("BACKUP_FORMAT") {
            Some(v) => v.parse()?,
            None => defaults.backup_mode,
        };

        let telegram = match (var("TELEGRAM_BOT_TOKEN"), var("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramSettings {
                bot_token: SecretString::from(token),
                chat_id,
            }),
            _ => None,
        };

        Ok(Self {
            devices_file: var("DEVICES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.devices_file),
            backup_dir: var("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_dir),
            log_dir: var("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            retention_days: parse_or("BACKUP_RETENTION_DAYS", var("BACKUP_RETENTION_DAYS"), defaults.retention_days),
            ssh_timeout_secs: parse_or("SSH_TIMEOUT", var("SSH_TIMEOUT"), defaults.ssh_timeout_secs),
            backup_mode,
            collect_system_info: parse_bool_or("COLLECT_SYSTEM_INFO", var("COLLECT_SYSTEM_INFO"), defaults.collect_system_info),
            log_level: parse_or("LOG_LEVEL", var("LOG_LEVEL"), defaults.log_level),
            log_to_file: parse_bool_or("LOG_TO_FILE", var("LOG_TO_FILE"), defaults.log_to_file),
            log_json: parse_log_format(var("LOG_FORMAT"), defaults.log_json),
            telegram,
            cron_schedule: var("CRON_SCHEDULE").map(|v| v.trim().to_string()),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => match raw.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid value '{}' for {}, using default", raw, key);
                default
            }
        },
        None => default,
    }
}

fn parse_log_format(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        Some(v) if v == "json" => true,
        Some(v) if v == "text" || v == "plain" => false,
        Some(v) => {
            warn!("Invalid log format '{}' for LOG_FORMAT, using default", v);
            default
        }
        None => default,
    }
}

fn parse_bool_or(key: &str, value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => false,
        Some(v) => {
            warn!("Invalid boolean '{}' for {}, using default", v, key);
            default
        }
        None => default,
    }
}
