use std::path::Path;

use remind_core::config::SyncSettings;
use remind_core::models::NewReminder;
use remind_core::OperationKind;

use crate::commands::common::{open_database, parse_optional_when, propagate, resolve_title};
use crate::error::CliError;

pub async fn run_add(
    title_parts: &[String],
    description: Option<String>,
    at: Option<&str>,
    due: Option<&str>,
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    let title = resolve_title(title_parts)?;
    let draft = NewReminder::new(title)?
        .with_description(description)
        .with_trigger_at(parse_optional_when(at)?)
        .with_due_at(parse_optional_when(due)?);

    let db = open_database(db_path).await?;
    let reminder = db.create_reminder(&draft).await?;
    propagate(&db, settings, &reminder, OperationKind::Create).await?;

    println!("{}", reminder.id);
    Ok(())
}
