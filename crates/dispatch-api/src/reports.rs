use chrono::{DateTime, SecondsFormat, Utc};
use dispatch_core::DeliveryRecord;
use libsql::{params, Connection};
use uuid::Uuid;

pub async fn ensure_schema(conn: &Connection) -> libsql::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            date TEXT NOT NULL
        )",
        (),
    )
    .await?;
    Ok(())
}

/// Store one report, assigning its id and timestamp
pub async fn insert_report(conn: &Connection, text: &str) -> libsql::Result<DeliveryRecord> {
    let record = DeliveryRecord {
        text: text.to_string(),
        date: Utc::now(),
        id: Uuid::now_v7().to_string(),
    };

    conn.execute(
        "INSERT INTO reports (id, text, date) VALUES (?1, ?2, ?3)",
        params![
            record.id.as_str(),
            record.text.as_str(),
            format_date(record.date)
        ],
    )
    .await?;

    tracing::debug!(id = %record.id, "Saved report");
    Ok(record)
}

#[cfg(test)]
pub async fn count_reports(conn: &Connection) -> libsql::Result<i64> {
    let mut rows = conn.query("SELECT COUNT(*) FROM reports", ()).await?;
    match rows.next().await? {
        Some(row) => row.get(0),
        None => Ok(0),
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}
