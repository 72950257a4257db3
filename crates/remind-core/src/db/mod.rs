//! Database layer for remind

mod connection;
mod migrations;
mod pending_repository;
mod reminder_repository;
mod sync_state_repository;

pub use connection::Database;
pub use pending_repository::{LibSqlPendingOperationRepository, PendingOperationRepository};
pub use reminder_repository::{LibSqlReminderRepository, ReminderRepository};
pub use sync_state_repository::{LibSqlSyncStateRepository, SyncStateRepository};
