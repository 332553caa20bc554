//! Foreground submission flow

use std::sync::Arc;

use chrono::Utc;

use crate::connectivity::Connectivity;
use crate::db::{Database, QueueStore, SyncRegistry, SYNC_TAG};
use crate::delivery::DeliveryClient;
use crate::error::Result;
use crate::models::{DeliveryRecord, QueueItem};
use crate::presentation::Presenter;
use crate::util::normalize_text_option;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// Sent directly and accepted
    Delivered(DeliveryRecord),
    /// Staged for the next drain
    Queued(QueueItem),
    /// Direct send failed; the report was not staged
    Failed(String),
}

/// Routes a submitted report to the remote store or the local queue
pub struct Submitter<D> {
    queue: QueueStore,
    registry: SyncRegistry,
    client: D,
    presenter: Arc<dyn Presenter>,
}

impl<D: DeliveryClient> Submitter<D> {
    pub fn new(db: &Database, client: D, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            queue: QueueStore::new(db.clone()),
            registry: SyncRegistry::new(db.clone()),
            client,
            presenter,
        }
    }

    pub async fn submit(&self, text: &str, connectivity: Connectivity) -> Result<SubmissionOutcome> {
        let Some(text) = normalize_text_option(Some(text.to_string())) else {
            return Ok(SubmissionOutcome::Ignored);
        };

        if connectivity.is_online() {
            return Ok(self.send_now(&text).await);
        }

        let item = match self.queue.append(&text).await {
            Ok(item) => item,
            Err(error) => {
                self.presenter.show_error(&error.to_string());
                return Err(error);
            }
        };
        self.presenter.show_placeholder(&item, Utc::now());

        if let Err(error) = self.registry.register(SYNC_TAG).await {
            tracing::warn!("Could not register background sync: {error}");
        }
        tracing::info!(sequence = item.sequence, "Report queued while offline");
        Ok(SubmissionOutcome::Queued(item))
    }

    async fn send_now(&self, text: &str) -> SubmissionOutcome {
        match self.client.deliver(text).await {
            Ok(record) => {
                self.presenter.show_record(&record);
                SubmissionOutcome::Delivered(record)
            }
            Err(error) => {
                let message = error.to_string();
                tracing::warn!("Direct delivery failed: {message}");
                self.presenter.show_error(&message);
                SubmissionOutcome::Failed(message)
            }
        }
    }
}
