use std::path::Path;

use remind_core::config::SyncSettings;
use remind_core::util::normalize_text_option;
use remind_core::{OperationKind, Reminder};

use crate::commands::common::{load_reminder, normalize_title, open_database, parse_when, propagate};
use crate::error::CliError;

/// Field changes requested by `remind edit`
#[derive(Debug, Default, Clone)]
pub struct ReminderEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub at: Option<String>,
    pub due: Option<String>,
    pub clear_at: bool,
    pub clear_due: bool,
}

impl ReminderEdit {
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.at.is_none()
            && self.due.is_none()
            && !self.clear_at
            && !self.clear_due
    }

    pub fn apply(&self, mut reminder: Reminder) -> Result<Reminder, CliError> {
        if let Some(title) = &self.title {
            reminder.title = normalize_title(title).ok_or(CliError::EmptyTitle)?;
        }
        if let Some(description) = &self.description {
            reminder.description = normalize_text_option(Some(description.clone()));
        }
        if self.clear_at {
            reminder.trigger_at = None;
        } else if let Some(at) = &self.at {
            reminder.trigger_at = Some(parse_when(at)?);
        }
        if self.clear_due {
            reminder.due_at = None;
        } else if let Some(due) = &self.due {
            reminder.due_at = Some(parse_when(due)?);
        }
        Ok(reminder)
    }
}

pub async fn run_edit(
    id: &str,
    edit: &ReminderEdit,
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    if edit.is_empty() {
        return Err(CliError::NothingToEdit);
    }

    let db = open_database(db_path).await?;
    let current = load_reminder(&db, id).await?;
    let updated = edit.apply(current.clone())?;

    if updated == current {
        println!("{}", updated.id);
        return Ok(());
    }

    let reminder = db.update_reminder(&updated).await?;
    propagate(&db, settings, &reminder, OperationKind::Update).await?;

    println!("{}", reminder.id);
    Ok(())
}
