//! Pending operation log repository

use crate::error::{Error, Result};
use crate::models::{OperationKind, PendingOperation, ReminderId};
use libsql::{params, Connection, Row, Value};

const SELECT_COLUMNS: &str =
    "SELECT id, reminder_id, kind, enqueued_at, payload FROM pending_operations";

/// Trait for the durable, FIFO pending operation log (async)
#[allow(async_fn_in_trait)]
pub trait PendingOperationRepository {
    /// Append an operation; the row is never updated afterwards
    async fn enqueue(
        &self,
        reminder_id: ReminderId,
        kind: OperationKind,
        payload: Option<&str>,
    ) -> Result<PendingOperation>;

    /// All queued operations in FIFO order (`enqueued_at`, then `id`)
    async fn list(&self) -> Result<Vec<PendingOperation>>;

    /// Queued operations concerning one reminder, FIFO order
    async fn list_for_reminder(&self, reminder_id: ReminderId) -> Result<Vec<PendingOperation>>;

    /// Remove one operation after its send attempt
    async fn remove(&self, id: i64) -> Result<()>;

    /// Number of queued operations
    async fn count(&self) -> Result<usize>;

    /// Drop every queued operation; returns how many were removed
    async fn clear(&self) -> Result<usize>;
}

/// libSQL implementation of `PendingOperationRepository`
pub struct LibSqlPendingOperationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPendingOperationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_operation(row: &Row) -> Result<PendingOperation> {
        let kind: String = row.get(2)?;
        let payload = match row.get_value(4)? {
            Value::Text(text) => Some(text),
            _ => None,
        };

        Ok(PendingOperation {
            id: row.get(0)?,
            reminder_id: ReminderId::new(row.get(1)?),
            kind: kind.parse()?,
            enqueued_at: row.get(3)?,
            payload,
        })
    }

    async fn query_operations(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<PendingOperation>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut operations = Vec::new();
        while let Some(row) = rows.next().await? {
            operations.push(Self::parse_operation(&row)?);
        }
        Ok(operations)
    }
}

impl PendingOperationRepository for LibSqlPendingOperationRepository<'_> {
    async fn enqueue(
        &self,
        reminder_id: ReminderId,
        kind: OperationKind,
        payload: Option<&str>,
    ) -> Result<PendingOperation> {
        if kind.carries_payload() && payload.is_none() {
            return Err(Error::InvalidInput(format!(
                "{kind} operation for reminder {reminder_id} requires a payload"
            )));
        }

        let enqueued_at = chrono::Utc::now().timestamp_millis();
        let payload = if kind.carries_payload() {
            payload.map(str::to_string)
        } else {
            None
        };

        self.conn
            .execute(
                "INSERT INTO pending_operations (reminder_id, kind, enqueued_at, payload)
                 VALUES (?, ?, ?, ?)",
                params![
                    reminder_id.get(),
                    kind.as_str(),
                    enqueued_at,
                    payload.clone().map_or(Value::Null, Value::Text)
                ],
            )
            .await?;

        Ok(PendingOperation {
            id: self.conn.last_insert_rowid(),
            reminder_id,
            kind,
            enqueued_at,
            payload,
        })
    }

    async fn list(&self) -> Result<Vec<PendingOperation>> {
        self.query_operations(
            &format!("{SELECT_COLUMNS} ORDER BY enqueued_at ASC, id ASC"),
            (),
        )
        .await
    }

    async fn list_for_reminder(&self, reminder_id: ReminderId) -> Result<Vec<PendingOperation>> {
        self.query_operations(
            &format!("{SELECT_COLUMNS} WHERE reminder_id = ? ORDER BY enqueued_at ASC, id ASC"),
            [reminder_id.get()],
        )
        .await
    }

    async fn remove(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM pending_operations WHERE id = ?", [id])
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM pending_operations", ())
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        usize::try_from(count).map_err(|error| Error::Database(error.to_string()))
    }

    async fn clear(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM pending_operations", ())
            .await?;
        usize::try_from(removed).map_err(|error| Error::Database(error.to_string()))
    }
}
