//! Storage capabilities the coordinator depends on

use async_trait::async_trait;

use crate::models::{OperationKind, PendingOperation, Reminder, ReminderId};
use crate::services::DatabaseService;
use crate::Result;

/// Local reminder store as seen by the sync core
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Insert or overwrite by id
    async fn insert_or_replace(&self, reminder: &Reminder) -> Result<()>;

    /// Delete by id; `false` when the id was not stored
    async fn delete_by_id(&self, id: ReminderId) -> Result<bool>;

    /// Every reminder in creation order
    async fn get_all(&self) -> Result<Vec<Reminder>>;

    /// Replace the whole set in one transaction
    async fn replace_all(&self, reminders: &[Reminder]) -> Result<()>;

    async fn record_snapshot_sent(&self, _at: i64) -> Result<()> {
        Ok(())
    }

    async fn record_snapshot_received(&self, _at: i64) -> Result<()> {
        Ok(())
    }
}

/// Durable FIFO log of not-yet-sent mutations
#[async_trait]
pub trait PendingLog: Send + Sync {
    async fn append(
        &self,
        reminder_id: ReminderId,
        kind: OperationKind,
        payload: Option<&str>,
    ) -> Result<PendingOperation>;

    /// Queued entries, oldest first
    async fn pending(&self) -> Result<Vec<PendingOperation>>;

    async fn remove(&self, id: i64) -> Result<()>;
}

#[async_trait]
impl ReminderStore for DatabaseService {
    async fn insert_or_replace(&self, reminder: &Reminder) -> Result<()> {
        self.upsert_reminder(reminder).await
    }

    async fn delete_by_id(&self, id: ReminderId) -> Result<bool> {
        self.delete_reminder(id).await
    }

    async fn get_all(&self) -> Result<Vec<Reminder>> {
        self.list_reminders().await
    }

    async fn replace_all(&self, reminders: &[Reminder]) -> Result<()> {
        self.replace_all_reminders(reminders).await
    }

    async fn record_snapshot_sent(&self, at: i64) -> Result<()> {
        self.mark_snapshot_sent(at).await
    }

    async fn record_snapshot_received(&self, at: i64) -> Result<()> {
        self.mark_snapshot_received(at).await
    }
}

#[async_trait]
impl PendingLog for DatabaseService {
    async fn append(
        &self,
        reminder_id: ReminderId,
        kind: OperationKind,
        payload: Option<&str>,
    ) -> Result<PendingOperation> {
        self.enqueue_operation(reminder_id, kind, payload).await
    }

    async fn pending(&self) -> Result<Vec<PendingOperation>> {
        self.list_pending().await
    }

    async fn remove(&self, id: i64) -> Result<()> {
        self.remove_pending(id).await
    }
}
