//! Local libSQL handle for one device's reminder store

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Best-effort pragmas; `journal_mode` answers with a row and some builds report that as an error.
const TUNING_PRAGMAS: [&str; 2] = ["PRAGMA journal_mode = WAL", "PRAGMA synchronous = NORMAL"];

/// An open, migrated reminder database
pub struct Database {
    // Kept alive for as long as `conn` is in use.
    _handle: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open (or create) the store at `path` and migrate it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let location = path.as_ref().to_string_lossy().into_owned();
        let handle = Builder::new_local(&location).build().await?;
        let database = Self::prepare(handle).await?;
        tracing::debug!(path = %location, "Opened reminder database");
        Ok(database)
    }

    /// Scratch store that disappears with the handle.
    pub async fn open_in_memory() -> Result<Self> {
        Self::prepare(Builder::new_local(":memory:").build().await?).await
    }

    async fn prepare(handle: LibSqlDatabase) -> Result<Self> {
        let conn = handle.connect()?;
        for pragma in TUNING_PRAGMAS {
            if let Err(error) = conn.execute(pragma, ()).await {
                tracing::debug!(pragma, %error, "Ignoring pragma failure");
            }
        }
        conn.execute("PRAGMA foreign_keys = ON", ()).await?;
        migrations::run(&conn).await?;
        Ok(Self {
            _handle: handle,
            conn,
        })
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
