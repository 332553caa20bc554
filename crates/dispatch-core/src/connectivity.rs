//! Online/offline state as an explicit, externally driven input.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Whether the remote store is believed to be reachable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Holder of the current connectivity state.
///
/// Whoever observes the network (a probe, a test) calls [`set`](Self::set);
/// interested parties subscribe and react to transitions.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    /// Record a new state; returns `true` when it differs from the previous one
    pub fn set(&self, state: Connectivity) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            tracing::info!(state = %state, "Connectivity changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }
}

/// Decides connectivity by asking the API's health endpoint
#[derive(Clone, Debug)]
pub struct ConnectivityProbe {
    health_url: String,
    client: reqwest::Client,
}

impl ConnectivityProbe {
    pub fn new(health_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            health_url: health_url.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub async fn check(&self) -> Connectivity {
        match self.client.get(&self.health_url).send().await {
            Ok(response) if response.status().is_success() => Connectivity::Online,
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "Health check failed");
                Connectivity::Offline
            }
            Err(error) => {
                tracing::debug!("Health check unreachable: {error}");
                Connectivity::Offline
            }
        }
    }

    /// Feed probe results into `monitor` every `interval`, forever
    pub async fn run(self, monitor: ConnectivityMonitor, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            monitor.set(self.check().await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;

    #[test]
    fn set_reports_transitions_only() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        assert!(!monitor.set(Connectivity::Offline));
        assert!(monitor.set(Connectivity::Online));
        assert!(!monitor.set(Connectivity::Online));
        assert_eq!(monitor.current(), Connectivity::Online);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let mut rx = monitor.subscribe();

        monitor.set(Connectivity::Online);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Connectivity::Online);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_reports_online_for_healthy_api() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route("/healthz", get(|| async { "ok" }));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let probe =
            ConnectivityProbe::new(format!("http://{addr}/healthz"), Duration::from_secs(2))
                .unwrap();
        assert_eq!(probe.check().await, Connectivity::Online);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_reports_offline_when_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe =
            ConnectivityProbe::new(format!("http://{addr}/healthz"), Duration::from_secs(2))
                .unwrap();
        assert_eq!(probe.check().await, Connectivity::Offline);
    }
}
