//! Background sync registrations

use libsql::params;

use super::Database;
use crate::error::Result;
use crate::util::{compact_text, unix_millis_now};

/// Tag under which the foreground requests a background drain
pub const SYNC_TAG: &str = "syncData";

/// A pending request for the background worker to run a sync handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRegistration {
    pub tag: String,
    /// Last time the tag was (re-)registered, Unix milliseconds
    pub registered_at: i64,
    pub attempts: i64,
    pub last_error: Option<String>,
}

/// Persistent registry the foreground writes and the worker consumes.
///
/// Registering a tag that is already pending refreshes it instead of adding a
/// second entry. A registration is only removed once its handler succeeds.
#[derive(Clone)]
pub struct SyncRegistry {
    db: Database,
}

impl SyncRegistry {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn register(&self, tag: &str) -> Result<()> {
        let conn = self.db.connection().await;
        conn.execute(
            "INSERT INTO sync_registrations (tag, registered_at) VALUES (?1, ?2)
             ON CONFLICT(tag) DO UPDATE SET registered_at = excluded.registered_at",
            params![tag, unix_millis_now()],
        )
        .await?;

        tracing::debug!(tag, "Background sync registered");
        Ok(())
    }

    pub async fn pending(&self) -> Result<Vec<SyncRegistration>> {
        let conn = self.db.connection().await;
        let mut rows = conn
            .query(
                "SELECT tag, registered_at, attempts, last_error
                 FROM sync_registrations
                 ORDER BY registered_at ASC",
                (),
            )
            .await?;

        let mut registrations = Vec::new();
        while let Some(row) = rows.next().await? {
            registrations.push(SyncRegistration {
                tag: row.get(0)?,
                registered_at: row.get(1)?,
                attempts: row.get(2)?,
                last_error: row.get(3)?,
            });
        }
        Ok(registrations)
    }

    /// Remember a failed handler run; the registration stays pending
    pub async fn record_failure(&self, tag: &str, error: &str) -> Result<()> {
        let conn = self.db.connection().await;
        conn.execute(
            "UPDATE sync_registrations
             SET attempts = attempts + 1, last_error = ?2
             WHERE tag = ?1",
            params![tag, compact_text(error)],
        )
        .await?;
        Ok(())
    }

    /// Drop a registration after its handler succeeded
    ///
    /// Only removes the entry if it was not refreshed after `registered_at`,
    /// so a registration made while the handler ran is kept for the next run.
    pub async fn complete(&self, tag: &str, registered_at: i64) -> Result<bool> {
        let conn = self.db.connection().await;
        let removed = conn
            .execute(
                "DELETE FROM sync_registrations WHERE tag = ?1 AND registered_at <= ?2",
                params![tag, registered_at],
            )
            .await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn setup() -> SyncRegistry {
        SyncRegistry::new(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_register_is_coalesced() {
        let registry = setup().await;
        registry.register(SYNC_TAG).await.unwrap();
        registry.register(SYNC_TAG).await.unwrap();

        let pending = registry.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tag, SYNC_TAG);
        assert_eq!(pending[0].attempts, 0);
        assert_eq!(pending[0].last_error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failure_keeps_registration() {
        let registry = setup().await;
        registry.register(SYNC_TAG).await.unwrap();
        registry
            .record_failure(SYNC_TAG, "connection refused")
            .await
            .unwrap();

        let pending = registry.pending().await.unwrap();
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("connection refused"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_complete_removes_registration() {
        let registry = setup().await;
        registry.register(SYNC_TAG).await.unwrap();
        let registered_at = registry.pending().await.unwrap()[0].registered_at;

        assert!(registry.complete(SYNC_TAG, registered_at).await.unwrap());
        assert!(registry.pending().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_complete_keeps_newer_registration() {
        let registry = setup().await;
        registry.register(SYNC_TAG).await.unwrap();
        let registered_at = registry.pending().await.unwrap()[0].registered_at;

        assert!(!registry.complete(SYNC_TAG, registered_at - 1).await.unwrap());
        assert_eq!(registry.pending().await.unwrap().len(), 1);
    }
}
