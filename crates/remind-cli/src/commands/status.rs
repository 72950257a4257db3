use std::path::Path;

use remind_core::config::SyncSettings;
use serde::Serialize;

use crate::commands::common::{format_sync_timestamp, open_database};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub role: String,
    pub database: String,
    pub reminders: usize,
    pub active: usize,
    pub pending: usize,
    pub tv_discovery: String,
    pub tv_address: Option<String>,
    pub last_snapshot_sent_at: Option<i64>,
    pub last_snapshot_received_at: Option<i64>,
}

pub async fn run_status(as_json: bool, db_path: &Path, settings: &SyncSettings) -> Result<(), CliError> {
    let report = collect_status(db_path, settings).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn collect_status(db_path: &Path, settings: &SyncSettings) -> Result<StatusReport, CliError> {
    let db = open_database(db_path).await?;
    let reminders = db.list_reminders().await?;
    let pending = db.count_pending().await?;
    let state = db.load_sync_state().await?;

    Ok(StatusReport {
        role: settings.role.as_str().to_string(),
        database: db_path.display().to_string(),
        active: reminders.iter().filter(|reminder| !reminder.completed).count(),
        reminders: reminders.len(),
        pending,
        tv_discovery: settings.tv.discovery.as_str().to_string(),
        tv_address: settings.tv.static_base_url(),
        last_snapshot_sent_at: state.last_snapshot_sent_at,
        last_snapshot_received_at: state.last_snapshot_received_at,
    })
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let mut lines = vec![
        format!("role:           {}", report.role),
        format!("database:       {}", report.database),
        format!("reminders:      {} ({} active)", report.reminders, report.active),
        format!("pending:        {}", report.pending),
    ];
    match &report.tv_address {
        Some(address) => lines.push(format!("tv:             {} ({address})", report.tv_discovery)),
        None => lines.push(format!("tv:             {}", report.tv_discovery)),
    }
    lines.push(format!(
        "last snapshot:  sent {}, received {}",
        format_sync_timestamp(report.last_snapshot_sent_at),
        format_sync_timestamp(report.last_snapshot_received_at)
    ));
    lines
}
