//! Data models for remind

mod pending;
mod reminder;
mod sync_state;

pub use pending::{OperationKind, PendingOperation};
pub use reminder::{NewReminder, Reminder, ReminderId};
pub use sync_state::SyncState;
