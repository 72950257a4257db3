//! Sync state repository implementation

use crate::error::Result;
use crate::models::SyncState;
use libsql::Connection;

const LAST_SNAPSHOT_SENT: &str = "last_snapshot_sent_at";
const LAST_SNAPSHOT_RECEIVED: &str = "last_snapshot_received_at";

/// Trait for snapshot bookkeeping (async)
#[allow(async_fn_in_trait)]
pub trait SyncStateRepository {
    /// Load the current sync state
    async fn load(&self) -> Result<SyncState>;

    /// Record that a snapshot was pushed at `at` (Unix ms)
    async fn mark_snapshot_sent(&self, at: i64) -> Result<()>;

    /// Record that an inbound snapshot was applied at `at` (Unix ms)
    async fn mark_snapshot_received(&self, at: i64) -> Result<()>;
}

/// libSQL implementation of `SyncStateRepository`
pub struct LibSqlSyncStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncStateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn get_value(&self, key: &str) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_state WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set_value(&self, key: &str, value: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?, ?)",
                libsql::params![key, value],
            )
            .await?;
        Ok(())
    }
}

impl SyncStateRepository for LibSqlSyncStateRepository<'_> {
    async fn load(&self) -> Result<SyncState> {
        Ok(SyncState {
            last_snapshot_sent_at: self.get_value(LAST_SNAPSHOT_SENT).await?,
            last_snapshot_received_at: self.get_value(LAST_SNAPSHOT_RECEIVED).await?,
        })
    }

    async fn mark_snapshot_sent(&self, at: i64) -> Result<()> {
        self.set_value(LAST_SNAPSHOT_SENT, at).await
    }

    async fn mark_snapshot_received(&self, at: i64) -> Result<()> {
        self.set_value(LAST_SNAPSHOT_RECEIVED, at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_default_state() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSyncStateRepository::new(db.connection());

        assert_eq!(repo.load().await.unwrap(), SyncState::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_marks_overwrite_previous_values() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSyncStateRepository::new(db.connection());

        repo.mark_snapshot_sent(100).await.unwrap();
        repo.mark_snapshot_sent(250).await.unwrap();
        repo.mark_snapshot_received(300).await.unwrap();

        let state = repo.load().await.unwrap();
        assert_eq!(state.last_snapshot_sent_at, Some(250));
        assert_eq!(state.last_snapshot_received_at, Some(300));
    }
}
