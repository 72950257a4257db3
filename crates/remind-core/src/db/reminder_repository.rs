//! Reminder repository implementation

use crate::error::{Error, Result};
use crate::models::{NewReminder, Reminder, ReminderId};
use libsql::{params, Connection, Row, Value};

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, trigger_at, due_at, created_at, completed FROM reminders";

/// Trait for reminder storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ReminderRepository {
    /// Insert a new reminder, letting the store assign its id
    async fn create(&self, draft: &NewReminder) -> Result<Reminder>;

    /// Get a reminder by ID
    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>>;

    /// List every reminder, oldest first
    async fn list(&self) -> Result<Vec<Reminder>>;

    /// Overwrite an existing reminder's fields
    async fn update(&self, reminder: &Reminder) -> Result<Reminder>;

    /// Insert or replace a reminder by its id, keeping the id verbatim
    async fn upsert(&self, reminder: &Reminder) -> Result<()>;

    /// Delete a reminder; returns whether a row was removed
    async fn delete(&self, id: ReminderId) -> Result<bool>;

    /// Atomically replace the whole set with `reminders`
    async fn replace_all(&self, reminders: &[Reminder]) -> Result<()>;
}

/// libSQL implementation of `ReminderRepository`
pub struct LibSqlReminderRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlReminderRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a reminder from a database row
    fn parse_reminder(row: &Row) -> Result<Reminder> {
        Ok(Reminder {
            id: ReminderId::new(row.get(0)?),
            title: row.get(1)?,
            description: optional_text(row.get_value(2)?),
            trigger_at: optional_integer(row.get_value(3)?),
            due_at: optional_integer(row.get_value(4)?),
            created_at: row.get(5)?,
            completed: row.get::<i64>(6)? != 0,
        })
    }

    async fn insert_or_replace(&self, reminder: &Reminder) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO reminders (id, title, description, trigger_at, due_at, created_at, completed)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    reminder.id.get(),
                    reminder.title.clone(),
                    nullable_text(reminder.description.as_deref()),
                    nullable_integer(reminder.trigger_at),
                    nullable_integer(reminder.due_at),
                    reminder.created_at,
                    i64::from(reminder.completed)
                ],
            )
            .await?;
        Ok(())
    }

    async fn replace_all_in_transaction(&self, reminders: &[Reminder]) -> Result<()> {
        self.conn.execute("DELETE FROM reminders", ()).await?;
        for reminder in reminders {
            self.insert_or_replace(reminder).await?;
        }
        Ok(())
    }
}

impl ReminderRepository for LibSqlReminderRepository<'_> {
    async fn create(&self, draft: &NewReminder) -> Result<Reminder> {
        self.conn
            .execute(
                "INSERT INTO reminders (title, description, trigger_at, due_at, created_at, completed)
                 VALUES (?, ?, ?, ?, ?, 0)",
                params![
                    draft.title.clone(),
                    nullable_text(draft.description.as_deref()),
                    nullable_integer(draft.trigger_at),
                    nullable_integer(draft.due_at),
                    draft.created_at
                ],
            )
            .await?;

        let id = ReminderId::new(self.conn.last_insert_rowid());
        Ok(draft.clone().into_reminder(id))
    }

    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?"), [id.get()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_reminder(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Reminder>> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} ORDER BY created_at ASC, id ASC"), ())
            .await?;

        let mut reminders = Vec::new();
        while let Some(row) = rows.next().await? {
            reminders.push(Self::parse_reminder(&row)?);
        }
        Ok(reminders)
    }

    async fn update(&self, reminder: &Reminder) -> Result<Reminder> {
        reminder.validate()?;

        let rows = self
            .conn
            .execute(
                "UPDATE reminders
                 SET title = ?, description = ?, trigger_at = ?, due_at = ?, completed = ?
                 WHERE id = ?",
                params![
                    reminder.title.clone(),
                    nullable_text(reminder.description.as_deref()),
                    nullable_integer(reminder.trigger_at),
                    nullable_integer(reminder.due_at),
                    i64::from(reminder.completed),
                    reminder.id.get()
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(reminder.id.to_string()));
        }

        self.get(reminder.id)
            .await?
            .ok_or_else(|| Error::NotFound(reminder.id.to_string()))
    }

    async fn upsert(&self, reminder: &Reminder) -> Result<()> {
        reminder.validate()?;
        self.insert_or_replace(reminder).await
    }

    async fn delete(&self, id: ReminderId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?", [id.get()])
            .await?;
        Ok(rows > 0)
    }

    async fn replace_all(&self, reminders: &[Reminder]) -> Result<()> {
        for reminder in reminders {
            reminder.validate()?;
        }

        self.conn.execute("BEGIN IMMEDIATE TRANSACTION", ()).await?;

        if let Err(e) = self.replace_all_in_transaction(reminders).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(())
    }
}

fn nullable_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn nullable_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

fn optional_integer(value: Value) -> Option<i64> {
    match value {
        Value::Integer(number) if number != 0 => Some(number),
        _ => None,
    }
}

fn optional_text(value: Value) -> Option<String> {
    match value {
        Value::Text(text) if !text.is_empty() => Some(text),
        _ => None,
    }
}
