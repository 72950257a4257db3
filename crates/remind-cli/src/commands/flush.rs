use std::path::Path;

use remind_core::config::SyncSettings;
use remind_core::sync::{FlushReport, SnapshotReport};

use crate::commands::common::{open_database, start_coordinator};
use crate::error::CliError;

pub async fn run_flush(db_path: &Path, settings: &SyncSettings) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let coordinator = start_coordinator(&db, settings)?;
    let report = coordinator.flush_pending().await;
    coordinator.shutdown().await;

    println!("{}", describe_flush(&report));
    Ok(())
}

pub async fn run_snapshot(db_path: &Path, settings: &SyncSettings) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let coordinator = start_coordinator(&db, settings)?;
    let report = coordinator.push_full_snapshot().await;
    coordinator.shutdown().await;

    let report = report.ok_or(CliError::NotPrimary(settings.role.as_str()))?;
    println!("{}", describe_snapshot(&report));
    Ok(())
}

pub fn describe_flush(report: &FlushReport) -> String {
    if report.skipped_offline {
        return "No peer reachable; pending operations kept".to_string();
    }

    let mut summary = format!(
        "Sent {} pending operation(s), dropped {}, {} delivery failure(s)",
        report.attempted, report.dropped, report.failed_deliveries
    );
    if let Some(snapshot) = &report.snapshot {
        summary.push_str("; ");
        summary.push_str(&describe_snapshot(snapshot));
    }
    summary
}

pub fn describe_snapshot(report: &SnapshotReport) -> String {
    if report.delivered == 0 && report.failed == 0 {
        return format!("Snapshot of {} reminder(s) not sent: no peer reachable", report.reminders);
    }
    format!(
        "Snapshot of {} reminder(s) delivered to {} peer(s), {} failed",
        report.reminders, report.delivered, report.failed
    )
}
