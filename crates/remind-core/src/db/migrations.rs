//! Schema migrations, tracked through `PRAGMA user_version`

use crate::error::Result;
use libsql::Connection;

struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

/// Ordered by version; a database at version N has applied every entry up to N.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: &[
            // AUTOINCREMENT keeps deleted ids from being reissued to a different reminder
            "CREATE TABLE IF NOT EXISTS reminders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                description TEXT,
                trigger_at INTEGER,
                due_at INTEGER,
                created_at INTEGER NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE INDEX IF NOT EXISTS idx_reminders_created ON reminders(created_at ASC)",
            "CREATE TABLE IF NOT EXISTS pending_operations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reminder_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('CREATE', 'UPDATE', 'DELETE')),
                enqueued_at INTEGER NOT NULL,
                payload TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_pending_enqueued ON pending_operations(enqueued_at ASC, id ASC)",
            "CREATE INDEX IF NOT EXISTS idx_pending_reminder ON pending_operations(reminder_id)",
        ],
    },
    Migration {
        version: 2,
        statements: &["CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )"],
    },
];

/// Bring the schema up to the newest version
pub async fn run(conn: &Connection) -> Result<()> {
    let current = user_version(conn).await?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply(conn, migration).await?;
        tracing::info!(version = migration.version, "Applied reminder schema migration");
    }
    Ok(())
}

async fn user_version(conn: &Connection) -> Result<i64> {
    let mut rows = conn.query("PRAGMA user_version", ()).await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.transaction().await?;
    for statement in migration.statements {
        tx.execute(statement, ()).await?;
    }
    // PRAGMA does not accept bound parameters
    tx.execute(&format!("PRAGMA user_version = {}", migration.version), ())
        .await?;
    tx.commit().await?;
    Ok(())
}
