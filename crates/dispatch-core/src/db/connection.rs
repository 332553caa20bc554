//! Local database connection management

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libsql::{Builder, Connection, Database as LibSqlDatabase};
use tokio::sync::{Mutex, MutexGuard};

use super::migrations;
use crate::error::{Error, Result};

/// Milliseconds a statement waits on a lock held by another process.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Shared handle to the local libSQL store.
///
/// Every handle opened on the same file is an independent connection, so two
/// processes (or two handles in one test) contend through `SQLite` locking.
/// Clones of one handle share a single connection guarded by a mutex.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    _db: LibSqlDatabase,
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open the store at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically. Any failure to obtain the file is
    /// reported as `StorageUnavailable`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(Error::storage_unavailable)?;
        }

        let path_str = path.to_string_lossy().to_string();
        let db = Builder::new_local(&path_str)
            .build()
            .await
            .map_err(Error::storage_unavailable)?;
        Self::initialize(db, Some(path)).await
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(Error::storage_unavailable)?;
        Self::initialize(db, None).await
    }

    async fn initialize(db: LibSqlDatabase, path: Option<PathBuf>) -> Result<Self> {
        let conn = db.connect().map_err(Error::storage_unavailable)?;
        configure(&conn).await;
        migrations::run(&conn)
            .await
            .map_err(Error::storage_unavailable)?;

        if let Some(path) = path.as_deref() {
            tracing::debug!(path = %path.display(), "Opened local store");
        }

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                _db: db,
                conn: Mutex::new(conn),
                path,
            }),
        })
    }

    /// Lock the shared connection for the duration of one operation
    pub(crate) async fn connection(&self) -> MutexGuard<'_, Connection> {
        self.inner.conn.lock().await
    }

    /// Filesystem location, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }
}

/// Configure `SQLite` for two processes sharing one file
async fn configure(conn: &Connection) {
    // Pragmas that report a value come back as rows, so they are stepped
    // through `query`; failures are ignored for in-memory databases.
    for pragma in [
        format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"),
        "PRAGMA journal_mode = WAL".to_string(),
        "PRAGMA synchronous = NORMAL".to_string(),
    ] {
        if let Ok(mut rows) = conn.query(&pragma, ()).await {
            rows.next().await.ok();
        }
    }
}
