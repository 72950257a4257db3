use std::path::Path;

use crate::commands::common::{
    format_reminder_lines, open_database, reminder_to_list_item, ReminderListItem,
};
use crate::error::CliError;

pub async fn run_list(active_only: bool, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let mut reminders = db.list_reminders().await?;
    if active_only {
        reminders.retain(|reminder| !reminder.completed);
    }

    if as_json {
        let json_items = reminders
            .iter()
            .map(reminder_to_list_item)
            .collect::<Vec<ReminderListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if reminders.is_empty() {
        println!("No reminders.");
    } else {
        for line in format_reminder_lines(&reminders) {
            println!("{line}");
        }
    }

    Ok(())
}
