use std::path::Path;

use chrono::Utc;

use crate::commands::common::{
    format_pending_lines, open_database, pending_to_list_item, PendingListItem,
};
use crate::error::CliError;

pub async fn run_pending(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let operations = db.list_pending().await?;
    let now_ms = Utc::now().timestamp_millis();

    if as_json {
        let json_items = operations
            .iter()
            .map(|operation| pending_to_list_item(operation, now_ms))
            .collect::<Vec<PendingListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if operations.is_empty() {
        println!("Nothing pending.");
        return Ok(());
    }

    for line in format_pending_lines(&operations, now_ms) {
        println!("{line}");
    }
    Ok(())
}
