pub mod sqlite;

use std::{ops::Deref, path::Path, sync::Arc};

use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};

use crate::base::types::{MailboxEntry, Res, StoreError};

use self::sqlite::SqliteMailbox;

// Traits.

/// Generic mailbox trait that stores must implement.
///
/// A mailbox holds messages for nicks that were offline when somebody tried
/// to reach them. Every write must be durable before the call returns.
#[async_trait]
pub trait GenericMailbox: Send + Sync + 'static {
    /// Store a new entry.
    ///
    /// Fails with [`StoreError::Duplicate`] when an entry with the same
    /// sender, recipient and timestamp already exists.
    async fn save(&self, entry: &MailboxEntry) -> Result<(), StoreError>;

    /// Remove and return the oldest entry for `recipient`, atomically.
    async fn pop_oldest(&self, recipient: &str) -> Result<Option<MailboxEntry>, StoreError>;

    /// Count the entries waiting for `recipient`.
    async fn pending(&self, recipient: &str) -> Result<usize, StoreError>;
}

// Structs.

/// Mailbox client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct MailboxClient {
    inner: Arc<dyn GenericMailbox>,
}

impl Deref for MailboxClient {
    type Target = dyn GenericMailbox;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl MailboxClient {
    pub fn new(inner: Arc<dyn GenericMailbox>) -> Self {
        Self { inner }
    }

    /// Open (or create) the SQLite mailbox at `path`.
    pub fn sqlite(path: &Path) -> Res<Self> {
        Ok(Self::new(Arc::new(SqliteMailbox::open(path)?)))
    }

    /// An in-memory SQLite mailbox; nothing survives the process.
    pub fn sqlite_memory() -> Res<Self> {
        Ok(Self::new(Arc::new(SqliteMailbox::open_in_memory()?)))
    }

    /// Consume every entry waiting for `recipient`, oldest first.
    ///
    /// Each entry is deleted in the same transaction that reads it, before it
    /// is yielded. The stream ends after the first error.
    pub fn drain(&self, recipient: &str) -> BoxStream<'static, Result<MailboxEntry, StoreError>> {
        let state = Some((self.clone(), recipient.to_string()));

        futures::stream::unfold(state, |state| async move {
            let (mailbox, recipient) = state?;

            match mailbox.pop_oldest(&recipient).await {
                Ok(Some(entry)) => Some((Ok(entry), Some((mailbox, recipient)))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use futures::TryStreamExt;

    use super::*;

    fn entry(sender: &str, recipient: &str, body: &str, offset_secs: i64) -> MailboxEntry {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        MailboxEntry::new(sender, recipient, body, base + Duration::seconds(offset_secs))
    }

    #[tokio::test]
    async fn saved_entry_is_drained_exactly_once() {
        let mailbox = MailboxClient::sqlite_memory().unwrap();
        let e = entry("alice", "bob", "hello there", 0);

        mailbox.save(&e).await.unwrap();

        let drained: Vec<_> = mailbox.drain("bob").try_collect().await.unwrap();
        assert_eq!(drained, vec![e]);

        let again: Vec<_> = mailbox.drain("bob").try_collect().await.unwrap();
        assert!(again.is_empty());
        assert_eq!(mailbox.pending("bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_recipient_drains_nothing() {
        let mailbox = MailboxClient::sqlite_memory().unwrap();
        mailbox.save(&entry("alice", "bob", "hi", 0)).await.unwrap();

        let drained: Vec<_> = mailbox.drain("carol").try_collect().await.unwrap();

        assert!(drained.is_empty());
        assert_eq!(mailbox.pending("bob").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn drains_oldest_first_and_only_for_recipient() {
        let mailbox = MailboxClient::sqlite_memory().unwrap();
        mailbox.save(&entry("carol", "bob", "second", 10)).await.unwrap();
        mailbox.save(&entry("alice", "bob", "first", 1)).await.unwrap();
        mailbox.save(&entry("alice", "dave", "not for bob", 5)).await.unwrap();
        mailbox.save(&entry("alice", "bob", "third", 20)).await.unwrap();

        let bodies: Vec<String> = mailbox.drain("bob").map_ok(|e| e.body).try_collect().await.unwrap();

        assert_eq!(bodies, vec!["first", "second", "third"]);
        assert_eq!(mailbox.pending("dave").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn drain_is_lazy() {
        let mailbox = MailboxClient::sqlite_memory().unwrap();
        mailbox.save(&entry("alice", "bob", "one", 1)).await.unwrap();
        mailbox.save(&entry("alice", "bob", "two", 2)).await.unwrap();

        let mut stream = mailbox.drain("bob");
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.body, "one");

        // Only the yielded entry is gone.
        assert_eq!(mailbox.pending("bob").await.unwrap(), 1);
        drop(stream);
        assert_eq!(mailbox.pending("bob").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn quotes_round_trip_unchanged() {
        let mailbox = MailboxClient::sqlite_memory().unwrap();
        let e = entry("o'brien", "bob'; DROP TABLE messages; --", "it's \"quoted\" text", 0);

        mailbox.save(&e).await.unwrap();

        let drained: Vec<_> = mailbox.drain("bob'; DROP TABLE messages; --").try_collect().await.unwrap();
        assert_eq!(drained, vec![e]);
    }

    #[tokio::test]
    async fn duplicate_key_is_an_error() {
        let mailbox = MailboxClient::sqlite_memory().unwrap();
        let e = entry("alice", "bob", "once", 0);

        mailbox.save(&e).await.unwrap();
        let err = mailbox.save(&e).await.unwrap_err();

        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(mailbox.pending("bob").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minibot.db");
        let e = entry("alice", "bob", "persisted", 0);

        {
            let mailbox = MailboxClient::sqlite(&path).unwrap();
            mailbox.save(&e).await.unwrap();
        }

        let reopened = MailboxClient::sqlite(&path).unwrap();
        let drained: Vec<_> = reopened.drain("bob").try_collect().await.unwrap();
        assert_eq!(drained, vec![e]);

        let reopened_again = MailboxClient::sqlite(&path).unwrap();
        assert_eq!(reopened_again.pending("bob").await.unwrap(), 0);
    }
}
