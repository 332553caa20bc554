//! Queue item model

use serde::{Deserialize, Serialize};

/// A report staged locally while it waits for delivery.
///
/// Only the submitted text is persisted; the remote store assigns the
/// identifier and timestamp once the report is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Auto-assigned key, strictly increasing and never reused
    pub sequence: i64,
    /// Raw submitted text
    pub payload: String,
}

impl QueueItem {
    /// First line of the payload truncated to `max_len` characters
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        let first_line = self.payload.lines().next().unwrap_or("");
        if first_line.chars().count() <= max_len {
            return first_line.to_string();
        }
        let truncated: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
