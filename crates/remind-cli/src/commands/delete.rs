use std::path::Path;

use remind_core::config::SyncSettings;
use remind_core::OperationKind;

use crate::commands::common::{load_reminder, open_database, propagate};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path, settings: &SyncSettings) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let reminder = load_reminder(&db, id).await?;

    db.delete_reminder(reminder.id).await?;
    propagate(&db, settings, &reminder, OperationKind::Delete).await?;

    println!("{}", reminder.id);
    Ok(())
}
