use std::sync::Arc;

use tokio::sync::mpsc;

use super::{DrainOutcome, Synchronizer, TriggerSource};
use crate::delivery::DeliveryClient;

/// Producer side of a context's "please drain" signal
#[derive(Clone, Debug)]
pub struct DrainTrigger {
    pub(super) tx: mpsc::Sender<TriggerSource>,
}

impl DrainTrigger {
    /// Ask for a drain.
    ///
    /// Returns `false` when a request is already waiting; the two collapse
    /// into one drain. Also `false` once the coordinator has stopped.
    pub fn request(&self, source: TriggerSource) -> bool {
        match self.tx.try_send(source) {
            Ok(()) => {
                tracing::debug!(%source, "Drain requested");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(%source, "Drain already pending");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Single consumer of drain requests within one context
pub struct DrainCoordinator<D> {
    synchronizer: Arc<Synchronizer<D>>,
    rx: mpsc::Receiver<TriggerSource>,
}

impl<D: DeliveryClient> DrainCoordinator<D> {
    pub fn new(synchronizer: Arc<Synchronizer<D>>) -> (Self, DrainTrigger) {
        let (tx, rx) = mpsc::channel(1);
        (Self { synchronizer, rx }, DrainTrigger { tx })
    }

    /// Run drains until every [`DrainTrigger`] is dropped
    pub async fn run(self) {
        self.run_with(|_, _| {}).await;
    }

    /// Like [`run`](Self::run), reporting each outcome to `observer`
    pub async fn run_with(mut self, mut observer: impl FnMut(TriggerSource, &DrainOutcome)) {
        while let Some(source) = self.rx.recv().await {
            tracing::info!(%source, "Draining pending reports");
            let outcome = self.synchronizer.drain().await;
            observer(source, &outcome);
        }
        tracing::debug!("Drain coordinator stopped");
    }
}
