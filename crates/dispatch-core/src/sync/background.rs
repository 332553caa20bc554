//! Background context: runs the sync handler for pending registrations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::{DrainOutcome, Synchronizer};
use crate::connectivity::Connectivity;
use crate::db::{SyncRegistration, SyncRegistry, SYNC_TAG};
use crate::delivery::DeliveryClient;
use crate::error::Result;

/// Sync event handler: one budgeted drain per dispatched registration
pub struct BackgroundHandler<D> {
    synchronizer: Arc<Synchronizer<D>>,
    registry: SyncRegistry,
    budget: Duration,
}

impl<D: DeliveryClient> BackgroundHandler<D> {
    pub const fn new(
        synchronizer: Arc<Synchronizer<D>>,
        registry: SyncRegistry,
        budget: Duration,
    ) -> Self {
        Self {
            synchronizer,
            registry,
            budget,
        }
    }

    /// Handle one sync event.
    ///
    /// The registration is removed only when the drain left nothing behind;
    /// otherwise the failure is recorded and it stays pending. A drain
    /// skipped because another context holds the lease leaves it untouched.
    pub async fn handle(&self, registration: &SyncRegistration) -> Result<DrainOutcome> {
        if registration.tag != SYNC_TAG {
            tracing::debug!(tag = %registration.tag, "Ignoring unknown sync tag");
            self.registry
                .complete(&registration.tag, registration.registered_at)
                .await?;
            return Ok(DrainOutcome::Idle);
        }

        let outcome = self.synchronizer.drain_within(self.budget).await;
        if outcome == DrainOutcome::Skipped {
            tracing::debug!(tag = %registration.tag, "Another context is draining");
        } else if outcome.is_success() {
            self.registry
                .complete(&registration.tag, registration.registered_at)
                .await?;
        } else {
            self.registry
                .record_failure(&registration.tag, &outcome.to_string())
                .await?;
        }
        Ok(outcome)
    }
}

/// When the worker fires the handler for a registration.
///
/// A registration is dispatched while online when the worker was armed by
/// startup or an offline to online transition, or when it was registered
/// again after its last dispatch. Failed registrations therefore wait for
/// the next reconnect or a new submission.
#[derive(Debug, Clone)]
pub struct DispatchState {
    armed: bool,
    last_dispatched: HashMap<String, i64>,
}

impl Default for DispatchState {
    fn default() -> Self {
        Self {
            armed: true,
            last_dispatched: HashMap::new(),
        }
    }
}

impl DispatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn should_dispatch(&self, connectivity: Connectivity, registration: &SyncRegistration) -> bool {
        if !connectivity.is_online() {
            return false;
        }
        self.armed
            || self
                .last_dispatched
                .get(&registration.tag)
                .is_none_or(|last| registration.registered_at > *last)
    }

    fn mark_dispatched(&mut self, registration: &SyncRegistration) {
        self.last_dispatched
            .insert(registration.tag.clone(), registration.registered_at);
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

/// Long-running background context
pub struct SyncWorker<D> {
    handler: BackgroundHandler<D>,
    registry: SyncRegistry,
    connectivity: watch::Receiver<Connectivity>,
    last_seen: Connectivity,
    state: DispatchState,
}

impl<D: DeliveryClient> SyncWorker<D> {
    pub fn new(
        handler: BackgroundHandler<D>,
        registry: SyncRegistry,
        connectivity: watch::Receiver<Connectivity>,
    ) -> Self {
        Self {
            handler,
            registry,
            connectivity,
            last_seen: Connectivity::Offline,
            state: DispatchState::new(),
        }
    }

    /// Check registrations once and run the handler for those that are due
    pub async fn poll(&mut self) -> Result<Vec<(SyncRegistration, DrainOutcome)>> {
        let current = *self.connectivity.borrow_and_update();
        if current.is_online() && !self.last_seen.is_online() {
            self.state.arm();
        }
        self.last_seen = current;

        if !current.is_online() {
            return Ok(Vec::new());
        }

        let mut handled = Vec::new();
        for registration in self.registry.pending().await? {
            if !self.state.should_dispatch(current, &registration) {
                continue;
            }
            tracing::info!(
                tag = %registration.tag,
                attempts = registration.attempts,
                "Running background sync"
            );
            let outcome = self.handler.handle(&registration).await?;
            tracing::info!(tag = %registration.tag, "Background sync finished: {outcome}");
            // Skipped registrations are retried on the next poll
            if outcome != DrainOutcome::Skipped {
                self.state.mark_dispatched(&registration);
            }
            handled.push((registration, outcome));
        }
        self.state.disarm();

        Ok(handled)
    }

    /// Poll on every connectivity change and every `interval` until the
    /// connectivity source goes away
    pub async fn run(mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = self.connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {}
            }

            if let Err(error) = self.poll().await {
                tracing::warn!("Background sync poll failed: {error}");
            }
        }
        tracing::debug!("Sync worker stopped");
    }
}
