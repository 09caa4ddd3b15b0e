//! SQLite implementation of the mailbox.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::{error, info, instrument};

use crate::base::types::{MailboxEntry, Res, StoreError};

use super::GenericMailbox;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        sender      TEXT,
        destination TEXT,
        moment      TEXT,
        message     TEXT,
        PRIMARY KEY (sender, destination, moment)
    );

    CREATE INDEX IF NOT EXISTS idx_messages_destination_nocase
        ON messages(destination COLLATE NOCASE, moment);
";

/// Mailbox stored in a single SQLite connection.
///
/// The connection sits behind a mutex, which serializes every save and pop.
/// Recipients match without regard to ASCII case, like IRC nicks.
pub struct SqliteMailbox {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMailbox {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Res<Self> {
        let conn = Connection::open(path).with_context(|| format!("Could not open the database at {}", path.display()))?;

        // WAL for crash safety, FULL so a commit is on disk when it returns.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;

        conn.execute_batch(SCHEMA).context("Could not initialize the database")?;

        info!("Database opened at {}", path.display());

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn open_in_memory() -> Res<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA).context("Could not initialize the database")?;

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

#[async_trait]
impl GenericMailbox for SqliteMailbox {
    #[instrument(skip_all, fields(sender = %entry.sender, recipient = %entry.recipient))]
    async fn save(&self, entry: &MailboxEntry) -> Result<(), StoreError> {
        let entry = entry.clone();

        self.with_conn(move |conn| {
            let moment = format_moment(&entry.created_at);

            let result = conn.execute(
                "INSERT INTO messages (sender, destination, moment, message) VALUES (?1, ?2, ?3, ?4)",
                params![entry.sender, entry.recipient, moment, entry.body],
            );

            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => Err(StoreError::Duplicate {
                    sender: entry.sender,
                    recipient: entry.recipient,
                    moment,
                }),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    #[instrument(skip(self))]
    async fn pop_oldest(&self, recipient: &str) -> Result<Option<MailboxEntry>, StoreError> {
        let recipient = recipient.to_string();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            loop {
                let row: Option<(i64, String, String, String, String)> = tx
                    .query_row(
                        "SELECT rowid, sender, destination, moment, message FROM messages
                         WHERE destination = ?1 COLLATE NOCASE
                         ORDER BY moment ASC, rowid ASC LIMIT 1",
                        [&recipient],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                    )
                    .optional()?;

                let Some((rowid, sender, destination, moment, body)) = row else {
                    tx.commit()?;
                    return Ok(None);
                };

                tx.execute("DELETE FROM messages WHERE rowid = ?1", [rowid])?;

                // Unreadable rows are dropped; the next row is tried.
                let Ok(created_at) = parse_moment(&moment) else {
                    error!(
                        "Discarding message from {} to {} with malformed moment `{}`: {}",
                        sender, destination, moment, body
                    );
                    continue;
                };

                tx.commit()?;

                return Ok(Some(MailboxEntry {
                    sender,
                    recipient: destination,
                    body,
                    created_at,
                }));
            }
        })
        .await
    }

    async fn pending(&self, recipient: &str) -> Result<usize, StoreError> {
        let recipient = recipient.to_string();

        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE destination = ?1 COLLATE NOCASE",
                [&recipient],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }
}

fn format_moment(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored moment; older rows use `2006-01-02 15:04:05 MST`.
fn parse_moment(moment: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(moment) {
        return Ok(at.with_timezone(&Utc));
    }

    moment
        .get(..19)
        .and_then(|prefix| NaiveDateTime::parse_from_str(prefix, "%Y-%m-%d %H:%M:%S").ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| StoreError::Timestamp(moment.to_string()))
}
