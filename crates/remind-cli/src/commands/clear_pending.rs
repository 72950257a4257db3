use std::path::Path;

use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_clear_pending(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let cleared = db.clear_pending().await?;
    tracing::warn!(cleared, "Pending operations dropped without sending");
    println!("Cleared {cleared} pending operation(s)");
    Ok(())
}
