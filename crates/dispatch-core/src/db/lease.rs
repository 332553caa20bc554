//! Drain lease shared by every context that opens the store

use std::time::Duration;

use libsql::params;

use super::Database;
use crate::error::Result;
use crate::util::{duration_millis, unix_millis_now};

/// Current holder of the drain lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseInfo {
    pub holder: String,
    /// Expiry as Unix milliseconds
    pub expires_at: i64,
}

/// Exclusive marker that at most one drain holds at a time.
///
/// The lease lives in a single row; acquisition, renewal and release are
/// each one conditional statement. Expired leases can be taken over, so a
/// drain that was killed mid-flight only blocks others until its TTL runs out.
#[derive(Clone)]
pub struct LeaseStore {
    db: Database,
}

impl LeaseStore {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Try to take the lease for `holder`; `false` means another holder has it
    pub async fn try_acquire(&self, holder: &str, ttl: Duration) -> Result<bool> {
        self.try_acquire_at(holder, ttl, unix_millis_now()).await
    }

    pub(crate) async fn try_acquire_at(&self, holder: &str, ttl: Duration, now: i64) -> Result<bool> {
        let expires_at = now.saturating_add(duration_millis(ttl));
        let conn = self.db.connection().await;
        let changed = conn
            .execute(
                "INSERT INTO drain_lease (id, holder, expires_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                     holder = excluded.holder,
                     expires_at = excluded.expires_at
                 WHERE drain_lease.expires_at <= ?3 OR drain_lease.holder = excluded.holder",
                params![holder, expires_at, now],
            )
            .await?;

        Ok(changed > 0)
    }

    /// Extend the lease; `false` means it expired and was taken over
    pub async fn renew(&self, holder: &str, ttl: Duration) -> Result<bool> {
        let expires_at = unix_millis_now().saturating_add(duration_millis(ttl));
        let conn = self.db.connection().await;
        let changed = conn
            .execute(
                "UPDATE drain_lease SET expires_at = ?2 WHERE id = 1 AND holder = ?1",
                params![holder, expires_at],
            )
            .await?;

        Ok(changed > 0)
    }

    /// Give the lease up if `holder` still owns it
    pub async fn release(&self, holder: &str) -> Result<()> {
        let conn = self.db.connection().await;
        conn.execute(
            "DELETE FROM drain_lease WHERE id = 1 AND holder = ?1",
            params![holder],
        )
        .await?;
        Ok(())
    }

    /// The lease row, if any (it may already be expired)
    pub async fn current(&self) -> Result<Option<LeaseInfo>> {
        let conn = self.db.connection().await;
        let mut rows = conn
            .query("SELECT holder, expires_at FROM drain_lease WHERE id = 1", ())
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(LeaseInfo {
                holder: row.get(0)?,
                expires_at: row.get(1)?,
            })),
            None => Ok(None),
        }
    }
}
