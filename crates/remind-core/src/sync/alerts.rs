//! Notification scheduling hook.
//!
//! The sync core tells the scheduler about every successful write; actually
//! raising a notification is the platform's business.

use crate::models::{Reminder, ReminderId};

pub trait AlertScheduler: Send + Sync {
    /// Called after a reminder was created or updated locally or by a peer
    fn schedule(&self, reminder: &Reminder);

    /// Called after a reminder was deleted or no longer wants an alert
    fn cancel(&self, id: ReminderId);

    /// Route a written reminder to `schedule` or `cancel`.
    fn refresh(&self, reminder: &Reminder) {
        if reminder.wants_alert() {
            self.schedule(reminder);
        } else {
            self.cancel(reminder.id);
        }
    }
}

/// Logs what would be scheduled
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertScheduler;

impl AlertScheduler for TracingAlertScheduler {
    fn schedule(&self, reminder: &Reminder) {
        tracing::info!(
            reminder_id = %reminder.id,
            trigger_at = reminder.trigger_at,
            title = %reminder.title,
            "Alert scheduled"
        );
    }

    fn cancel(&self, id: ReminderId) {
        tracing::debug!(reminder_id = %id, "Alert cancelled");
    }
}
