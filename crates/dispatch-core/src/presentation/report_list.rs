//! In-memory list of reports shown during a session

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::models::{DeliveryRecord, QueueItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Accepted by the remote store
    Delivered,
    /// Staged locally, waiting for a drain
    Pending,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub text: String,
    pub date: DateTime<Utc>,
    /// Server id for delivered reports
    pub id: Option<String>,
    pub status: EntryStatus,
}

impl ListEntry {
    /// `text (local date)` as rendered in the list
    pub fn line(&self) -> String {
        let local = self.date.with_timezone(&Local);
        format!("{} ({})", self.text, local.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReportList {
    entries: Vec<ListEntry>,
}

impl ReportList {
    pub fn push_record(&mut self, record: &DeliveryRecord) -> &ListEntry {
        self.push(ListEntry {
            text: record.text.clone(),
            date: record.date,
            id: Some(record.id.clone()),
            status: EntryStatus::Delivered,
        })
    }

    pub fn push_placeholder(&mut self, item: &QueueItem, staged_at: DateTime<Utc>) -> &ListEntry {
        self.push(ListEntry {
            text: item.payload.clone(),
            date: staged_at,
            id: None,
            status: EntryStatus::Pending,
        })
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: ListEntry) -> &ListEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_keep_server_identity() {
        let mut list = ReportList::default();
        let record = DeliveryRecord {
            text: "hello".to_string(),
            date: Utc::now(),
            id: "abc".to_string(),
        };

        let entry = list.push_record(&record).clone();
        assert_eq!(entry.id.as_deref(), Some("abc"));
        assert_eq!(entry.status, EntryStatus::Delivered);
        assert!(entry.line().starts_with("hello ("));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn placeholders_have_no_id() {
        let mut list = ReportList::default();
        let item = QueueItem {
            sequence: 7,
            payload: "offline note".to_string(),
        };

        list.push_placeholder(&item, Utc::now());
        assert!(!list.is_empty());
        assert_eq!(list.entries()[0].id, None);
        assert_eq!(list.entries()[0].status, EntryStatus::Pending);
    }
}
