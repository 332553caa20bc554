//! Durable queue of reports waiting for delivery

use std::path::Path;

use libsql::params;

use super::Database;
use crate::error::{Error, Result};
use crate::models::QueueItem;

/// Staging area for reports submitted while offline.
///
/// Each operation is a single statement, so a cancelled or interrupted
/// caller never leaves a partially applied append or clear behind.
#[derive(Clone)]
pub struct QueueStore {
    db: Database,
}

impl QueueStore {
    /// Open (or create) the store file and return a queue over it
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Create a queue over an already opened database
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Underlying database handle
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Stage one payload and return it with its assigned sequence
    pub async fn append(&self, payload: &str) -> Result<QueueItem> {
        let conn = self.db.connection().await;
        conn.execute(
            "INSERT INTO pending_reports (payload) VALUES (?1)",
            params![payload],
        )
        .await
        .map_err(Error::write_failed)?;
        let sequence = conn.last_insert_rowid();

        tracing::debug!(sequence, "Staged report for later delivery");
        Ok(QueueItem {
            sequence,
            payload: payload.to_string(),
        })
    }

    /// All staged items in insertion order, without removing them
    pub async fn list_all(&self) -> Result<Vec<QueueItem>> {
        let conn = self.db.connection().await;
        let mut rows = conn
            .query(
                "SELECT sequence, payload FROM pending_reports ORDER BY sequence ASC",
                (),
            )
            .await
            .map_err(Error::read_failed)?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await.map_err(Error::read_failed)? {
            items.push(QueueItem {
                sequence: row.get(0).map_err(Error::read_failed)?,
                payload: row.get(1).map_err(Error::read_failed)?,
            });
        }

        Ok(items)
    }

    /// Number of staged items
    pub async fn pending_count(&self) -> Result<usize> {
        let conn = self.db.connection().await;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM pending_reports", ())
            .await
            .map_err(Error::read_failed)?;

        let count: i64 = match rows.next().await.map_err(Error::read_failed)? {
            Some(row) => row.get(0).map_err(Error::read_failed)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Remove every staged item
    pub async fn clear(&self) -> Result<u64> {
        let conn = self.db.connection().await;
        let removed = conn
            .execute("DELETE FROM pending_reports", ())
            .await
            .map_err(Error::clear_failed)?;

        tracing::debug!(removed, "Cleared pending reports");
        Ok(removed)
    }

    /// Remove staged items up to and including `sequence`
    ///
    /// Items appended after a batch was read keep their place in the queue.
    pub async fn clear_through(&self, sequence: i64) -> Result<u64> {
        let conn = self.db.connection().await;
        let removed = conn
            .execute(
                "DELETE FROM pending_reports WHERE sequence <= ?1",
                params![sequence],
            )
            .await
            .map_err(Error::clear_failed)?;

        tracing::debug!(removed, through = sequence, "Cleared delivered reports");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    async fn setup() -> QueueStore {
        QueueStore::new(Database::open_in_memory().await.unwrap())
    }

    fn payloads(items: &[QueueItem]) -> Vec<&str> {
        items.iter().map(|item| item.payload.as_str()).collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_all_empty() {
        let queue = setup().await;
        assert!(queue.list_all().await.unwrap().is_empty());
        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_append_then_list_preserves_order() {
        let queue = setup().await;
        queue.append("a").await.unwrap();
        queue.append("b").await.unwrap();

        let before = queue.list_all().await.unwrap();
        let appended = queue.append("c").await.unwrap();
        let after = queue.list_all().await.unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after.last(), Some(&appended));
        assert_eq!(payloads(&after), vec!["a", "b", "c"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sequences_increase_across_clear() {
        let queue = setup().await;
        let first = queue.append("first").await.unwrap();
        queue.clear().await.unwrap();
        let second = queue.append("second").await.unwrap();

        assert!(second.sequence > first.sequence);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_removes_everything() {
        let queue = setup().await;
        queue.append("a").await.unwrap();
        queue.append("b").await.unwrap();

        assert_eq!(queue.clear().await.unwrap(), 2);
        assert!(queue.list_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_through_keeps_later_items() {
        let queue = setup().await;
        queue.append("a").await.unwrap();
        let b = queue.append("b").await.unwrap();
        queue.append("late").await.unwrap();

        assert_eq!(queue.clear_through(b.sequence).await.unwrap(), 2);
        assert_eq!(payloads(&queue.list_all().await.unwrap()), vec!["late"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_items_survive_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("queue.db");

        {
            let queue = QueueStore::open(&db_path).await.unwrap();
            queue.append("persisted").await.unwrap();
        }

        let reopened = QueueStore::open(&db_path).await.unwrap();
        assert_eq!(
            payloads(&reopened.list_all().await.unwrap()),
            vec!["persisted"]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_two_handles_share_one_file() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("queue.db");

        let foreground = QueueStore::open(&db_path).await.unwrap();
        let background = QueueStore::open(&db_path).await.unwrap();

        foreground.append("from page").await.unwrap();
        assert_eq!(background.pending_count().await.unwrap(), 1);

        background.clear().await.unwrap();
        assert!(foreground.list_all().await.unwrap().is_empty());
    }
}
