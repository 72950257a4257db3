//! Shared database service wrapper used by the CLI, the TV receiver and the
//! sync coordinator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, LibSqlPendingOperationRepository, LibSqlReminderRepository,
    LibSqlSyncStateRepository, PendingOperationRepository, ReminderRepository,
    SyncStateRepository,
};
use crate::models::{
    NewReminder, OperationKind, PendingOperation, Reminder, ReminderId, SyncState,
};
use crate::Result;

/// Thread-safe service for DB and repository operations.
///
/// Every call takes the connection lock for its whole duration, so a
/// snapshot replacement is never observed half-applied by another caller.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    ///
    /// A file that is not a database is moved aside and a fresh store is
    /// created in its place.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path).await {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    path = %db_path.display(),
                    %error,
                    "Reminder database is unreadable; moving it aside and starting empty"
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await?
            }
            Err(error) => return Err(error),
        };

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn is_corrupted_db_error(error: &crate::Error) -> bool {
        error
            .to_string()
            .to_ascii_lowercase()
            .contains("file is not a database")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let base_name = db_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("remind.db");
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                from = %db_path.display(),
                to = %backup_path.display(),
                "Moved corrupted reminder database"
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };
        let sidecar_prefix = format!("{base_name}-");

        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if file_name.to_string_lossy().starts_with(&sidecar_prefix) {
                let path = entry.path();
                std::fs::remove_file(&path)?;
                tracing::warn!(path = %path.display(), "Removed stale database sidecar");
            }
        }

        Ok(())
    }

    /// List reminders in creation order.
    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        let db = self.db.lock().await;
        let repo = LibSqlReminderRepository::new(db.connection());
        repo.list().await
    }

    /// Fetch a reminder by id.
    pub async fn get_reminder(&self, id: ReminderId) -> Result<Option<Reminder>> {
        let db = self.db.lock().await;
        let repo = LibSqlReminderRepository::new(db.connection());
        repo.get(id).await
    }

    /// Create a reminder; the store assigns its id.
    pub async fn create_reminder(&self, draft: &NewReminder) -> Result<Reminder> {
        let db = self.db.lock().await;
        let repo = LibSqlReminderRepository::new(db.connection());
        repo.create(draft).await
    }

    /// Update an existing reminder.
    pub async fn update_reminder(&self, reminder: &Reminder) -> Result<Reminder> {
        let db = self.db.lock().await;
        let repo = LibSqlReminderRepository::new(db.connection());
        repo.update(reminder).await
    }

    /// Insert or replace a reminder keeping its id.
    pub async fn upsert_reminder(&self, reminder: &Reminder) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlReminderRepository::new(db.connection());
        repo.upsert(reminder).await
    }

    /// Delete a reminder; `false` when it was already absent.
    pub async fn delete_reminder(&self, id: ReminderId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlReminderRepository::new(db.connection());
        repo.delete(id).await
    }

    /// Atomically replace every stored reminder.
    pub async fn replace_all_reminders(&self, reminders: &[Reminder]) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlReminderRepository::new(db.connection());
        repo.replace_all(reminders).await
    }

    /// Append a pending operation.
    pub async fn enqueue_operation(
        &self,
        reminder_id: ReminderId,
        kind: OperationKind,
        payload: Option<&str>,
    ) -> Result<PendingOperation> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.enqueue(reminder_id, kind, payload).await
    }

    /// Pending operations in FIFO order.
    pub async fn list_pending(&self) -> Result<Vec<PendingOperation>> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.list().await
    }

    /// Pending operations for one reminder.
    pub async fn list_pending_for(&self, reminder_id: ReminderId) -> Result<Vec<PendingOperation>> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.list_for_reminder(reminder_id).await
    }

    /// Remove one pending operation.
    pub async fn remove_pending(&self, id: i64) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.remove(id).await
    }

    /// Number of pending operations.
    pub async fn count_pending(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.count().await
    }

    /// Drop every pending operation.
    pub async fn clear_pending(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.clear().await
    }

    /// Load snapshot bookkeeping.
    pub async fn load_sync_state(&self) -> Result<SyncState> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncStateRepository::new(db.connection());
        repo.load().await
    }

    /// Record an outbound snapshot push.
    pub async fn mark_snapshot_sent(&self, at: i64) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncStateRepository::new(db.connection());
        repo.mark_snapshot_sent(at).await
    }

    /// Record an applied inbound snapshot.
    pub async fn mark_snapshot_received(&self, at: i64) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncStateRepository::new(db.connection());
        repo.mark_snapshot_received(at).await
    }
}
