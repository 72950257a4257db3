//! Reminder model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::util::nonzero_millis;

/// Identifier of a reminder.
///
/// Assigned once by the store of the device that created the reminder and
/// carried verbatim by every peer afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(i64);

impl ReminderId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ReminderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReminderId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A reminder as stored on every device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Stable identifier shared by all peers
    pub id: ReminderId,
    /// Non-empty title
    pub title: String,
    /// Optional free text
    pub description: Option<String>,
    /// When a notification should fire (Unix ms)
    pub trigger_at: Option<i64>,
    /// Deadline, distinct from the notification trigger (Unix ms)
    pub due_at: Option<i64>,
    /// Creation timestamp (Unix ms), default ordering key
    pub created_at: i64,
    /// Completion flag; new reminders are active
    pub completed: bool,
}

impl Reminder {
    /// Check the invariants every stored or synced reminder must hold.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)
    }

    /// Collapse empty descriptions and zero timestamps into `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.description = self.description.filter(|text| !text.is_empty());
        self.trigger_at = nonzero_millis(self.trigger_at);
        self.due_at = nonzero_millis(self.due_at);
        self
    }

    /// Whether the alert scheduler should arrange a notification.
    #[must_use]
    pub const fn wants_alert(&self) -> bool {
        self.trigger_at.is_some() && !self.completed
    }
}

/// Input for creating a reminder; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub trigger_at: Option<i64>,
    pub due_at: Option<i64>,
    pub created_at: i64,
}

impl NewReminder {
    /// Create a reminder draft, rejecting blank titles.
    pub fn new(title: impl Into<String>) -> Result<Self> {
        let title = title.into().trim().to_string();
        validate_title(&title)?;
        Ok(Self {
            title,
            description: None,
            trigger_at: None,
            due_at: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|text| !text.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn with_trigger_at(mut self, trigger_at: Option<i64>) -> Self {
        self.trigger_at = nonzero_millis(trigger_at);
        self
    }

    #[must_use]
    pub const fn with_due_at(mut self, due_at: Option<i64>) -> Self {
        self.due_at = nonzero_millis(due_at);
        self
    }

    /// Attach the id assigned by the store.
    #[must_use]
    pub fn into_reminder(self, id: ReminderId) -> Reminder {
        Reminder {
            id,
            title: self.title,
            description: self.description,
            trigger_at: self.trigger_at,
            due_at: self.due_at,
            created_at: self.created_at,
            completed: false,
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput(
            "reminder title must not be empty".to_string(),
        ));
    }
    Ok(())
}
