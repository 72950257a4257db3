use std::path::Path;

use remind_core::config::SyncSettings;
use remind_core::OperationKind;

use crate::commands::common::{load_reminder, open_database, propagate};
use crate::error::CliError;

pub async fn run_complete(
    id: &str,
    undo: bool,
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let mut reminder = load_reminder(&db, id).await?;

    let completed = !undo;
    if reminder.completed != completed {
        reminder.completed = completed;
        let reminder = db.update_reminder(&reminder).await?;
        propagate(&db, settings, &reminder, OperationKind::Update).await?;
    }

    println!("{}", reminder.id);
    Ok(())
}
