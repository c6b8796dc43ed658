//! Operator messages built from run results
//!
//! Messages use Telegram's HTML parse mode.

use chrono::{DateTime, Local};

use crate::models::backup::{BackupResult, RunStatus, RunSummary};

/// Date format used in operator messages
pub const MESSAGE_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Escape text for HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a duration as `H:MM:SS`, dropping sub-second precision
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn artifact_label(count: usize) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{} files", count)
    }
}

fn successful_line(result: &BackupResult) -> String {
    format!(
        "• {} ({})",
        escape_html(&result.device_name),
        artifact_label(result.retained_configs)
    )
}

fn failed_line(result: &BackupResult) -> String {
    format!("• {}", escape_html(&result.device_name))
}

/// Build the run summary message
pub fn summarize(summary: &RunSummary) -> String {
    let status = summary.status();
    let (emoji, title) = match status {
        RunStatus::Success => ("✅", "Success"),
        RunStatus::Partial => ("⚠️", "Partial"),
        RunStatus::Failure => ("❌", "Failure"),
        RunStatus::Empty => ("ℹ️", "No devices"),
    };

    let mut message = format!("{} <b>FortiGate Backup - {}</b>\n\n", emoji, title);
    message.push_str("📊 <b>Summary:</b>\n");
    message.push_str(&format!("• Successful: {}\n", summary.success_count));
    message.push_str(&format!("• Failed: {}\n", summary.failure_count));
    message.push_str(&format!("• Duration: {}\n", format_duration(summary.duration())));
    message.push_str(&format!(
        "• Date: {}",
        summary.finished_at.format(MESSAGE_DATE_FORMAT)
    ));

    let successful: Vec<String> = summary.successful().map(successful_line).collect();
    let failed: Vec<String> = summary.failed().map(failed_line).collect();

    match status {
        RunStatus::Success => {
            message.push_str("\n\n✅ <b>Successful devices:</b>\n");
            message.push_str(&successful.join("\n"));
        }
        RunStatus::Partial => {
            message.push_str("\n\n✅ <b>Successful devices:</b>\n");
            message.push_str(&successful.join("\n"));
            message.push_str("\n\n❌ <b>Failed devices:</b>\n");
            message.push_str(&failed.join("\n"));
        }
        RunStatus::Failure => {
            message.push_str("\n\n❌ <b>Failed devices:</b>\n");
            message.push_str(&failed.join("\n"));
        }
        RunStatus::Empty => {}
    }

    message
}

/// Build the single-device message
pub fn device_message(result: &BackupResult, host: &str, at: &DateTime<Local>) -> String {
    let header = if result.success {
        "✅ <b>Backup completed</b>"
    } else {
        "❌ <b>Backup failed</b>"
    };

    format!(
        "{}\nDevice: {}\nHost: {}\nDate: {}",
        header,
        escape_html(&result.device_name),
        escape_html(host),
        at.format(MESSAGE_DATE_FORMAT)
    )
}

/// Build the test notification message
pub fn test_message(at: &DateTime<Local>) -> String {
    format!(
        "🧪 <b>Notification test</b>\nFortiGate SSH backup\nDate: {}",
        at.format(MESSAGE_DATE_FORMAT)
    )
}
