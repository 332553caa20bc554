//! Reusable connection to the report store.
//!
//! The connection is opened lazily on first use, checked with `SELECT 1`
//! every time it is handed out, re-opened when that check fails, and closed
//! explicitly on shutdown.

use std::fmt;
use std::path::PathBuf;

use libsql::{Builder, Connection, Database};
use tokio::sync::Mutex;

use crate::reports;

/// Where the report store lives
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Local(PathBuf),
    Remote { url: String, auth_token: String },
}

impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => formatter.debug_tuple("Local").field(path).finish(),
            Self::Remote { url, .. } => formatter
                .debug_struct("Remote")
                .field("url", url)
                .field("auth_token", &"[REDACTED]")
                .finish(),
        }
    }
}

struct Pooled {
    _db: Database,
    conn: Connection,
}

pub struct ConnectionPool {
    target: DatabaseTarget,
    slot: Mutex<Option<Pooled>>,
}

impl ConnectionPool {
    /// Create the pool without connecting
    pub fn new(target: DatabaseTarget) -> Self {
        Self {
            target,
            slot: Mutex::new(None),
        }
    }

    /// A live connection, opening or re-opening it when needed
    pub async fn acquire(&self) -> libsql::Result<Connection> {
        let mut slot = self.slot.lock().await;

        if let Some(pooled) = slot.as_ref() {
            match ping(&pooled.conn).await {
                Ok(()) => return Ok(pooled.conn.clone()),
                Err(error) => {
                    tracing::warn!("Report store connection failed liveness check: {error}");
                    *slot = None;
                }
            }
        }

        let pooled = self.connect().await?;
        let conn = pooled.conn.clone();
        *slot = Some(pooled);
        Ok(conn)
    }

    #[cfg(test)]
    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Drop the pooled connection
    pub async fn close(&self) {
        if self.slot.lock().await.take().is_some() {
            tracing::info!("Closed report store connection");
        }
    }

    async fn connect(&self) -> libsql::Result<Pooled> {
        let db = match &self.target {
            DatabaseTarget::Local(path) => Builder::new_local(path).build().await?,
            DatabaseTarget::Remote { url, auth_token } => {
                Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await?
            }
        };
        let conn = db.connect()?;
        reports::ensure_schema(&conn).await?;

        tracing::info!(store = ?self.target, "Connected to report store");
        Ok(Pooled { _db: db, conn })
    }
}

async fn ping(conn: &Connection) -> libsql::Result<()> {
    let mut rows = conn.query("SELECT 1", ()).await?;
    rows.next().await?;
    Ok(())
}
