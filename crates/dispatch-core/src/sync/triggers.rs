use std::fmt;

use tokio::sync::watch;

use super::DrainTrigger;
use crate::connectivity::Connectivity;

/// What asked for a drain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerSource {
    /// Offline to online transition in the foreground
    Reconnect,
    /// Explicit user request
    Manual,
    /// Context started while already online
    Startup,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reconnect => "reconnect",
            Self::Manual => "manual",
            Self::Startup => "startup",
        };
        f.write_str(name)
    }
}

/// Request a drain on every offline to online transition.
///
/// Also requests one immediately when already online. Returns once the
/// connectivity sender is gone.
pub async fn forward_reconnects(mut rx: watch::Receiver<Connectivity>, trigger: DrainTrigger) {
    let mut previous = *rx.borrow_and_update();
    if previous.is_online() {
        trigger.request(TriggerSource::Startup);
    }

    while rx.changed().await.is_ok() {
        let current = *rx.borrow_and_update();
        if !previous.is_online() && current.is_online() {
            trigger.request(TriggerSource::Reconnect);
        }
        previous = current;
    }
}
