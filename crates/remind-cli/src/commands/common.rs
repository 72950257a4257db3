use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use remind_core::codec::MessageCodec;
use remind_core::config::SyncSettings;
use remind_core::services::DatabaseService;
use remind_core::sync::SyncCoordinator;
use remind_core::transport::{build_client, discovery_from_settings, HttpTvTransport, TvDiscovery};
use remind_core::util::normalize_text_option;
use remind_core::{OperationKind, PendingOperation, Reminder, ReminderId};
use serde::Serialize;

use crate::error::CliError;

pub const ENV_DB_PATH: &str = "REMIND_DB_PATH";
pub const ENV_CONFIG: &str = "REMIND_CONFIG";

const LOCAL_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Serialize)]
pub struct ReminderListItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub trigger_at: Option<i64>,
    pub trigger_at_iso: Option<String>,
    pub due_at: Option<i64>,
    pub due_at_iso: Option<String>,
    pub created_at: i64,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct PendingListItem {
    pub id: i64,
    pub reminder_id: i64,
    pub kind: String,
    pub enqueued_at: i64,
    pub relative_time: String,
    pub has_payload: bool,
}

pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, CliError> {
    cli_db_path
        .or_else(|| normalize_text_option(lookup(ENV_DB_PATH)).map(PathBuf::from))
        .or_else(default_db_path)
        .ok_or(CliError::MissingDirectory("data"))
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("remind").join("remind.db"))
}

pub fn resolve_config_path(
    cli_config_path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, CliError> {
    cli_config_path
        .or_else(|| normalize_text_option(lookup(ENV_CONFIG)).map(PathBuf::from))
        .or_else(default_config_path)
        .ok_or(CliError::MissingDirectory("config"))
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("remind").join("sync.json"))
}

/// Settings file (defaults when absent) with environment overrides applied.
pub fn load_settings(
    config_path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SyncSettings, CliError> {
    let settings = SyncSettings::load_from_path(config_path)?.with_overrides(lookup);
    settings.validate()?;
    Ok(settings)
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path).await?)
}

/// Discovery strategy from the TV settings, with the HTTP client it probes through.
pub fn tv_discovery(
    settings: &SyncSettings,
) -> Result<Option<(reqwest::Client, Arc<dyn TvDiscovery>)>, CliError> {
    let client = build_client(&settings.tv)?;
    Ok(discovery_from_settings(&settings.tv, &client)?.map(|discovery| (client, discovery)))
}

fn tv_transport(settings: &SyncSettings) -> Result<Option<HttpTvTransport>, CliError> {
    let Some((client, discovery)) = tv_discovery(settings)? else {
        return Ok(None);
    };
    tracing::debug!(discovery = discovery.name(), "TV fan-out enabled");
    Ok(Some(HttpTvTransport::new(
        client,
        discovery,
        MessageCodec::new(settings.wire_version),
    )))
}

fn coordinator_with(
    db: &DatabaseService,
    settings: &SyncSettings,
    transport: Option<HttpTvTransport>,
) -> SyncCoordinator {
    let builder =
        SyncCoordinator::builder(Arc::new(db.clone()), Arc::new(db.clone())).settings(settings);
    match transport {
        Some(transport) => builder.transport(Arc::new(transport)).start(),
        None => builder.start(),
    }
}

/// Start a coordinator over `db`, fanning out to the TV when discovery is enabled.
pub fn start_coordinator(
    db: &DatabaseService,
    settings: &SyncSettings,
) -> Result<SyncCoordinator, CliError> {
    Ok(coordinator_with(db, settings, tv_transport(settings)?))
}

/// Queue `reminder` for the peers and give the worker one chance to deliver it.
///
/// The pending entry is written even when the TV transport cannot be built;
/// whatever cannot be sent now stays in the log for the next flush.
pub async fn propagate(
    db: &DatabaseService,
    settings: &SyncSettings,
    reminder: &Reminder,
    kind: OperationKind,
) -> Result<(), CliError> {
    let transport = tv_transport(settings).unwrap_or_else(|error| {
        tracing::warn!(%error, "TV transport unavailable; change stays queued");
        None
    });
    let coordinator = coordinator_with(db, settings, transport);
    let queued = coordinator.schedule_mutation(reminder, kind).await;
    coordinator.shutdown().await;
    queued?;
    Ok(())
}

pub fn parse_reminder_id(id: &str) -> Result<ReminderId, CliError> {
    match id.trim().parse::<ReminderId>() {
        Ok(parsed) if parsed.get() > 0 => Ok(parsed),
        _ => Err(CliError::InvalidReminderId(id.trim().to_string())),
    }
}

pub async fn load_reminder(db: &DatabaseService, id: &str) -> Result<Reminder, CliError> {
    let reminder_id = parse_reminder_id(id)?;
    db.get_reminder(reminder_id)
        .await?
        .ok_or_else(|| CliError::ReminderNotFound(reminder_id.to_string()))
}

/// Parse a point in time given on the command line into Unix milliseconds.
///
/// Accepts Unix milliseconds, RFC 3339, or a local `YYYY-MM-DD HH:MM`.
pub fn parse_when(value: &str) -> Result<i64, CliError> {
    let value = value.trim();

    if let Ok(millis) = value.parse::<i64>() {
        if millis > 0 {
            return Ok(millis);
        }
        return Err(CliError::InvalidTime(value.to_string()));
    }

    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.timestamp_millis());
    }

    for format in LOCAL_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            if let Some(local) = Local.from_local_datetime(&naive).earliest() {
                return Ok(local.timestamp_millis());
            }
        }
    }

    Err(CliError::InvalidTime(value.to_string()))
}

pub fn parse_optional_when(value: Option<&str>) -> Result<Option<i64>, CliError> {
    value.map(parse_when).transpose()
}

pub fn resolve_title(title_parts: &[String]) -> Result<String, CliError> {
    if let Some(title) = normalize_title(&title_parts.join(" ")) {
        return Ok(title);
    }

    if let Some(title) = read_piped_stdin()? {
        return Ok(title);
    }

    Err(CliError::EmptyTitle)
}

pub fn normalize_title(title: &str) -> Option<String> {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(buffer.lines().next().and_then(normalize_title))
}

pub fn reminder_to_list_item(reminder: &Reminder) -> ReminderListItem {
    ReminderListItem {
        id: reminder.id.get(),
        title: reminder.title.clone(),
        description: reminder.description.clone(),
        trigger_at: reminder.trigger_at,
        trigger_at_iso: reminder.trigger_at.map(format_timestamp),
        due_at: reminder.due_at,
        due_at_iso: reminder.due_at.map(format_timestamp),
        created_at: reminder.created_at,
        completed: reminder.completed,
    }
}

pub fn pending_to_list_item(operation: &PendingOperation, now_ms: i64) -> PendingListItem {
    PendingListItem {
        id: operation.id,
        reminder_id: operation.reminder_id.get(),
        kind: operation.kind.to_string(),
        enqueued_at: operation.enqueued_at,
        relative_time: format_relative_time(operation.enqueued_at, now_ms),
        has_payload: operation.payload.is_some(),
    }
}

pub fn format_reminder_lines(reminders: &[Reminder]) -> Vec<String> {
    reminders
        .iter()
        .map(|reminder| {
            let mark = if reminder.completed { 'x' } else { ' ' };
            let mut line = format!("{:>4}  [{mark}]  {}", reminder.id.get(), reminder.title);
            if let Some(trigger_at) = reminder.trigger_at {
                line.push_str(&format!("  @ {}", format_timestamp(trigger_at)));
            }
            if let Some(due_at) = reminder.due_at {
                line.push_str(&format!("  due {}", format_timestamp(due_at)));
            }
            line
        })
        .collect()
}

pub fn format_pending_lines(operations: &[PendingOperation], now_ms: i64) -> Vec<String> {
    operations
        .iter()
        .map(|operation| {
            format!(
                "{:>4}  {:<6}  reminder={}  {}",
                operation.id,
                operation.kind.as_str(),
                operation.reminder_id,
                format_relative_time(operation.enqueued_at, now_ms)
            )
        })
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| {
            date_time
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

pub fn format_sync_timestamp(timestamp_ms: Option<i64>) -> String {
    timestamp_ms.map_or_else(
        || "never".to_string(),
        |timestamp_ms| {
            DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map_or_else(
                || timestamp_ms.to_string(),
                |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            )
        },
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}
