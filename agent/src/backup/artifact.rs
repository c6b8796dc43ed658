//! Backup artifact files

use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::info;

use crate::errors::BackupError;
use crate::filesys::dir::Dir;
use crate::storage::registry::Device;

/// Timestamp embedded in artifact names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Capture time written in artifact headers
pub const HEADER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Artifact name timestamp for the given instant
pub fn artifact_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn config_file_name(device_name: &str, timestamp: &str) -> String {
    format!("{}_config_{}.conf", device_name, timestamp)
}

pub fn system_file_name(device_name: &str, timestamp: &str) -> String {
    format!("{}_system_{}.txt", device_name, timestamp)
}

fn separator() -> String {
    format!("#{}\n", "=".repeat(50))
}

/// Render a configuration artifact
pub fn render_config(device: &Device, captured_at: &DateTime<Local>, content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 256);
    out.push_str("# FortiGate configuration backup\n");
    out.push_str(&format!("# Device: {} ({})\n", device.name, device.host));
    out.push_str(&format!("# Date: {}\n", captured_at.format(HEADER_DATE_FORMAT)));
    out.push_str(&format!("# VDOM: {}\n", device.vdom));
    out.push_str(&separator());
    out.push('\n');
    out.push_str(content);
    out
}

/// Render a system-info artifact from `(label, output)` sections
pub fn render_system_info(
    device: &Device,
    captured_at: &DateTime<Local>,
    sections: &[(String, String)],
) -> String {
    let mut out = String::new();
    out.push_str("# FortiGate system information\n");
    out.push_str(&format!("# Device: {} ({})\n", device.name, device.host));
    out.push_str(&format!("# Date: {}\n", captured_at.format(HEADER_DATE_FORMAT)));
    out.push_str(&separator());
    out.push('\n');

    let banner = "=".repeat(20);
    for (label, output) in sections {
        out.push_str(&format!("\n{} {} {}\n", banner, label.to_uppercase(), banner));
        out.push_str(output);
        out.push('\n');
    }
    out
}

/// Writes artifacts into the backup directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: Dir,
}

impl ArtifactWriter {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Dir {
        &self.dir
    }

    /// Write `{name}_config_{timestamp}.conf`
    pub async fn write_config(
        &self,
        device: &Device,
        timestamp: &str,
        content: &str,
    ) -> Result<PathBuf, BackupError> {
        let file = self.dir.file(&config_file_name(&device.name, timestamp));
        let rendered = render_config(device, &Local::now(), content);

        file.write_atomic(rendered.as_bytes()).await.map_err(|e| {
            BackupError::WriteError(format!("{}: {}", file.path().display(), e))
        })?;

        info!("Backup saved: {}", file.path().display());
        Ok(file.path().to_path_buf())
    }

    /// Number of `{name}_config_*.conf` files currently in the directory
    pub async fn count_configs(&self, device_name: &str) -> Result<usize, BackupError> {
        let prefix = format!("{}_config_", device_name);
        let count = self
            .dir
            .list_files()
            .await?
            .iter()
            .filter_map(|file| file.path().file_name().and_then(|n| n.to_str()))
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".conf"))
            .count();
        Ok(count)
    }

    /// Write `{name}_system_{timestamp}.txt`, skipped when every section is empty
    pub async fn write_system_info(
        &self,
        device: &Device,
        timestamp: &str,
        sections: &[(String, String)],
    ) -> Result<Option<PathBuf>, BackupError> {
        let sections: Vec<(String, String)> = sections
            .iter()
            .filter(|(_, output)| !output.trim().is_empty())
            .cloned()
            .collect();
        if sections.is_empty() {
            return Ok(None);
        }

        let file = self.dir.file(&system_file_name(&device.name, timestamp));
        let rendered = render_system_info(device, &Local::now(), &sections);

        file.write_atomic(rendered.as_bytes()).await.map_err(|e| {
            BackupError::WriteError(format!("{}: {}", file.path().display(), e))
        })?;

        info!("System information saved: {}", file.path().display());
        Ok(Some(file.path().to_path_buf()))
    }
}
