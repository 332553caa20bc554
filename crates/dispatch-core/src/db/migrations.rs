//! Local store migrations

use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
///
/// Safe to call from several processes opening the same fresh file: each
/// version is applied at most once.
pub async fn run(conn: &Connection) -> libsql::Result<()> {
    if get_version(conn).await? >= CURRENT_VERSION {
        return Ok(());
    }

    migrate_v1(conn).await?;
    migrate_v2(conn).await?;
    migrate_v3(conn).await?;

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> libsql::Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Apply a list of statements inside one transaction
///
/// The version is checked again under the write lock, so a migration that
/// another connection committed in the meantime is skipped.
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> libsql::Result<()> {
    conn.execute("BEGIN IMMEDIATE", ()).await?;

    match apply_locked(conn, version, statements).await {
        Ok(applied) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
            if applied {
                tracing::info!("Migrated local store to version {version}");
            }
            Ok(())
        }
        Err(e) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(e)
        }
    }
}

async fn apply_locked(
    conn: &Connection,
    version: i32,
    statements: &[&str],
) -> libsql::Result<bool> {
    if get_version(conn).await? >= version {
        return Ok(false);
    }

    for stmt in statements {
        conn.execute(stmt, ()).await?;
    }
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )
    .await?;

    Ok(true)
}

/// Migration to version 1: pending report queue
async fn migrate_v1(conn: &Connection) -> libsql::Result<()> {
    apply(
        conn,
        1,
        &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            // AUTOINCREMENT keeps sequences strictly increasing across clears
            "CREATE TABLE IF NOT EXISTS pending_reports (
                sequence INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL
            )",
        ],
    )
    .await
}

/// Migration to version 2: drain lease and background sync registrations
async fn migrate_v2(conn: &Connection) -> libsql::Result<()> {
    apply(
        conn,
        2,
        &[
            "CREATE TABLE IF NOT EXISTS drain_lease (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                holder TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sync_registrations (
                tag TEXT PRIMARY KEY,
                registered_at INTEGER NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT
            )",
        ],
    )
    .await
}

/// Migration to version 3: versioned asset cache
async fn migrate_v3(conn: &Connection) -> libsql::Result<()> {
    apply(
        conn,
        3,
        &[
            "CREATE TABLE IF NOT EXISTS asset_cache (
                cache_name TEXT NOT NULL,
                url TEXT NOT NULL,
                content_type TEXT,
                body BLOB NOT NULL,
                cached_at INTEGER NOT NULL,
                PRIMARY KEY (cache_name, url)
            )",
            "CREATE INDEX IF NOT EXISTS idx_asset_cache_name ON asset_cache(cache_name)",
        ],
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = ?1
                )",
                [name],
            )
            .await
            .unwrap();

        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_create_all_tables() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for table in [
            "pending_reports",
            "drain_lease",
            "sync_registrations",
            "asset_cache",
        ] {
            assert!(table_exists(&conn, table).await, "missing table {table}");
        }
    }
}
