//! Draining staged reports to the remote store.

mod background;
mod coordinator;
mod outcome;
mod triggers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::db::{Database, LeaseStore, QueueStore};
use crate::delivery::DeliveryClient;
use crate::presentation::{notify_if_permitted, Notification, Notifier};

pub use background::{BackgroundHandler, DispatchState, SyncWorker};
pub use coordinator::{DrainCoordinator, DrainTrigger};
pub use outcome::{DrainFailure, DrainOutcome};
pub use triggers::{forward_reconnects, TriggerSource};

pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(60);

/// Delivers every staged report and clears the batch once all succeeded.
///
/// Drains from different contexts are serialized by the lease in the store.
/// The first failed delivery stops the batch and nothing is cleared, so a
/// report is removed only after it (and everything before it) was delivered.
pub struct Synchronizer<D> {
    queue: QueueStore,
    lease: LeaseStore,
    client: D,
    notifier: Arc<dyn Notifier>,
    lease_ttl: Duration,
    holder: String,
}

impl<D: DeliveryClient> Synchronizer<D> {
    /// `context` names the execution context in the lease holder id
    pub fn new(db: &Database, client: D, notifier: Arc<dyn Notifier>, context: &str) -> Self {
        Self {
            queue: QueueStore::new(db.clone()),
            lease: LeaseStore::new(db.clone()),
            client,
            notifier,
            lease_ttl: DEFAULT_LEASE_TTL,
            holder: format!("{context}:{}", Uuid::now_v7()),
        }
    }

    #[must_use]
    pub const fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    pub async fn drain(&self) -> DrainOutcome {
        let delivered = AtomicUsize::new(0);
        self.drain_counting(&delivered).await
    }

    /// Drain, giving up once `budget` has elapsed.
    ///
    /// On overrun the in-flight delivery is dropped and the lease released;
    /// nothing is cleared.
    pub async fn drain_within(&self, budget: Duration) -> DrainOutcome {
        let delivered = AtomicUsize::new(0);
        match tokio::time::timeout(budget, self.drain_counting(&delivered)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(?budget, "Drain exceeded its time budget");
                self.release_lease().await;
                DrainOutcome::Failed {
                    delivered: delivered.load(Ordering::Relaxed),
                    failure: DrainFailure::TimedOut,
                }
            }
        }
    }

    async fn drain_counting(&self, delivered: &AtomicUsize) -> DrainOutcome {
        match self.lease.try_acquire(&self.holder, self.lease_ttl).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(holder = %self.holder, "Drain lease held elsewhere");
                return DrainOutcome::Skipped;
            }
            Err(error) => {
                tracing::warn!("Could not acquire drain lease: {error}");
                return DrainOutcome::Failed {
                    delivered: 0,
                    failure: DrainFailure::Lease(error.to_string()),
                };
            }
        }

        let outcome = self.drain_batch(delivered).await;
        self.release_lease().await;

        match &outcome {
            DrainOutcome::Completed { delivered } => {
                tracing::info!(delivered, "Drain completed");
                notify_if_permitted(self.notifier.as_ref(), &Notification::sync_completed());
            }
            DrainOutcome::Failed { delivered, failure } => {
                tracing::warn!(delivered, "Drain failed: {failure}");
            }
            DrainOutcome::Idle | DrainOutcome::Skipped => {}
        }
        outcome
    }

    async fn drain_batch(&self, delivered: &AtomicUsize) -> DrainOutcome {
        let items = match self.queue.list_all().await {
            Ok(items) => items,
            Err(error) => {
                return DrainOutcome::Failed {
                    delivered: 0,
                    failure: DrainFailure::Read(error.to_string()),
                }
            }
        };

        let Some(last) = items.last().map(|item| item.sequence) else {
            return DrainOutcome::Idle;
        };

        for item in &items {
            if let Err(error) = self.client.deliver(&item.payload).await {
                return DrainOutcome::Failed {
                    delivered: delivered.load(Ordering::Relaxed),
                    failure: DrainFailure::Delivery {
                        sequence: item.sequence,
                        message: error.to_string(),
                    },
                };
            }
            delivered.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(sequence = item.sequence, "Delivered staged report");

            match self.lease.renew(&self.holder, self.lease_ttl).await {
                Ok(true) => {}
                Ok(false) => {
                    return DrainOutcome::Failed {
                        delivered: delivered.load(Ordering::Relaxed),
                        failure: DrainFailure::LeaseLost,
                    }
                }
                Err(error) => {
                    return DrainOutcome::Failed {
                        delivered: delivered.load(Ordering::Relaxed),
                        failure: DrainFailure::Lease(error.to_string()),
                    }
                }
            }
        }

        let delivered = delivered.load(Ordering::Relaxed);
        match self.queue.clear_through(last).await {
            Ok(_) => DrainOutcome::Completed { delivered },
            Err(error) => DrainOutcome::Failed {
                delivered,
                failure: DrainFailure::Clear(error.to_string()),
            },
        }
    }

    async fn release_lease(&self) {
        if let Err(error) = self.lease.release(&self.holder).await {
            tracing::warn!(holder = %self.holder, "Could not release drain lease: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryResult;
    use crate::models::DeliveryRecord;
    use crate::presentation::{MemoryNotifier, NotificationPermission};
    use crate::testing::FakeDelivery;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn payloads(items: &[crate::models::QueueItem]) -> Vec<String> {
        items.iter().map(|item| item.payload.clone()).collect()
    }

    async fn seeded(db: &Database, items: &[&str]) -> QueueStore {
        let queue = QueueStore::new(db.clone());
        for item in items {
            queue.append(item).await.unwrap();
        }
        queue
    }

    fn granted() -> Arc<MemoryNotifier> {
        Arc::new(MemoryNotifier::new(NotificationPermission::Granted))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_store_never_calls_client() {
        let db = Database::open_in_memory().await.unwrap();
        let client = Arc::new(FakeDelivery::new());
        let notifier = granted();
        let sync = Synchronizer::new(&db, client.clone(), notifier.clone(), "test");

        assert_eq!(sync.drain().await, DrainOutcome::Idle);
        assert!(client.attempts().is_empty());
        assert!(notifier.shown().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_success_clears_and_notifies() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = seeded(&db, &["a", "b", "c"]).await;
        let client = Arc::new(FakeDelivery::new());
        let notifier = granted();
        let sync = Synchronizer::new(&db, client.clone(), notifier.clone(), "test");

        assert_eq!(
            sync.drain().await,
            DrainOutcome::Completed { delivered: 3 }
        );
        assert_eq!(client.delivered(), vec!["a", "b", "c"]);
        assert!(queue.list_all().await.unwrap().is_empty());
        assert_eq!(notifier.shown(), vec![Notification::sync_completed()]);
        assert!(LeaseStore::new(db).current().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_partial_failure_keeps_whole_batch() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = seeded(&db, &["a", "b", "c"]).await;
        let client = Arc::new(FakeDelivery::failing_on("b"));
        let notifier = granted();
        let sync = Synchronizer::new(&db, client.clone(), notifier.clone(), "test");

        let outcome = sync.drain().await;
        assert!(matches!(
            outcome,
            DrainOutcome::Failed {
                delivered: 1,
                failure: DrainFailure::Delivery { sequence: 2, .. },
            }
        ));
        assert_eq!(client.attempts(), vec!["a", "b"]);
        assert_eq!(payloads(&queue.list_all().await.unwrap()), vec!["a", "b", "c"]);
        assert!(notifier.shown().is_empty());
        assert!(LeaseStore::new(db).current().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_items_are_redelivered_next_drain() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = seeded(&db, &["a", "b"]).await;
        let notifier = granted();

        let failing = Synchronizer::new(
            &db,
            FakeDelivery::failing_on("b"),
            notifier.clone(),
            "first",
        );
        assert!(!failing.drain().await.is_success());

        let client = Arc::new(FakeDelivery::new());
        let healthy = Synchronizer::new(&db, client.clone(), notifier, "second");
        assert!(healthy.drain().await.is_success());
        assert_eq!(client.delivered(), vec!["a", "b"]);
        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_notification_requires_permission() {
        let db = Database::open_in_memory().await.unwrap();
        seeded(&db, &["a"]).await;
        let notifier = Arc::new(MemoryNotifier::new(NotificationPermission::Default));
        let sync = Synchronizer::new(&db, FakeDelivery::new(), notifier.clone(), "test");

        assert!(sync.drain().await.is_success());
        assert!(notifier.shown().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_held_lease_skips_without_touching_store() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = seeded(&db, &["x"]).await;
        LeaseStore::new(db.clone())
            .try_acquire("elsewhere", DEFAULT_LEASE_TTL)
            .await
            .unwrap();

        let client = Arc::new(FakeDelivery::new());
        let sync = Synchronizer::new(&db, client.clone(), granted(), "test");

        assert_eq!(sync.drain().await, DrainOutcome::Skipped);
        assert!(client.attempts().is_empty());
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_drains_deliver_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let page_db = Database::open(&path).await.unwrap();
        let worker_db = Database::open(&path).await.unwrap();
        let queue = seeded(&page_db, &["x"]).await;

        let client = Arc::new(FakeDelivery::new());
        let page = Synchronizer::new(&page_db, client.clone(), granted(), "page");
        let worker = Synchronizer::new(&worker_db, client.clone(), granted(), "worker");

        let (first, second) = tokio::join!(page.drain(), worker.drain());

        assert_eq!(client.delivered(), vec!["x"]);
        assert!(first.is_success() || second.is_success());
        assert!(queue.list_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_items_appended_mid_drain_survive() {
        struct AppendingClient {
            queue: QueueStore,
        }

        impl DeliveryClient for AppendingClient {
            async fn deliver(&self, payload: &str) -> DeliveryResult<DeliveryRecord> {
                if payload == "first" {
                    self.queue.append("late").await.unwrap();
                }
                FakeDelivery::new().deliver(payload).await
            }
        }

        let db = Database::open_in_memory().await.unwrap();
        let queue = seeded(&db, &["first"]).await;
        let client = AppendingClient {
            queue: queue.clone(),
        };
        let sync = Synchronizer::new(&db, client, granted(), "test");

        assert_eq!(
            sync.drain().await,
            DrainOutcome::Completed { delivered: 1 }
        );
        assert_eq!(payloads(&queue.list_all().await.unwrap()), vec!["late"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lost_lease_stops_without_clearing() {
        struct StealingClient {
            lease: LeaseStore,
        }

        impl DeliveryClient for StealingClient {
            async fn deliver(&self, payload: &str) -> DeliveryResult<DeliveryRecord> {
                let far_future = crate::util::unix_millis_now() + 3_600_000;
                assert!(self
                    .lease
                    .try_acquire_at("thief", DEFAULT_LEASE_TTL, far_future)
                    .await
                    .unwrap());
                FakeDelivery::new().deliver(payload).await
            }
        }

        let db = Database::open_in_memory().await.unwrap();
        let queue = seeded(&db, &["a", "b"]).await;
        let client = StealingClient {
            lease: LeaseStore::new(db.clone()),
        };
        let sync = Synchronizer::new(&db, client, granted(), "test");

        let outcome = sync.drain().await;
        assert_eq!(
            outcome,
            DrainOutcome::Failed {
                delivered: 1,
                failure: DrainFailure::LeaseLost,
            }
        );
        assert_eq!(queue.pending_count().await.unwrap(), 2);
        let lease = LeaseStore::new(db).current().await.unwrap().unwrap();
        assert_eq!(lease.holder, "thief");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_budget_overrun_releases_lease() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = seeded(&db, &["slow"]).await;
        let sync = Synchronizer::new(
            &db,
            FakeDelivery::slow(Duration::from_secs(10)),
            granted(),
            "test",
        );

        let outcome = sync.drain_within(Duration::from_millis(100)).await;
        assert_eq!(
            outcome,
            DrainOutcome::Failed {
                delivered: 0,
                failure: DrainFailure::TimedOut,
            }
        );
        assert_eq!(queue.pending_count().await.unwrap(), 1);
        assert!(LeaseStore::new(db).current().await.unwrap().is_none());
    }
}
