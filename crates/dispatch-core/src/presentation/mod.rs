//! User-facing reflection of submissions, connectivity, and sync results.

mod report_list;

use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::connectivity::Connectivity;
use crate::models::{DeliveryRecord, QueueItem};

pub use report_list::{EntryStatus, ListEntry, ReportList};

/// Title of the notification shown after a successful background drain
pub const SYNC_COMPLETED_TITLE: &str = "Synchronization completed";
const SYNC_COMPLETED_BODY: &str = "Your reports have been delivered.";

/// Receives everything the foreground context shows the user
pub trait Presenter: Send + Sync {
    /// A report the remote store accepted
    fn show_record(&self, record: &DeliveryRecord);

    /// A report staged offline, stamped with local time
    fn show_placeholder(&self, item: &QueueItem, staged_at: DateTime<Utc>);

    /// Inline error for a failed submission
    fn show_error(&self, message: &str);

    /// Connectivity banner
    fn show_connectivity(&self, state: Connectivity);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    Default,
}

impl NotificationPermission {
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl FromStr for NotificationPermission {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            "default" => Ok(Self::Default),
            other => Err(format!("unknown notification permission: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn sync_completed() -> Self {
        Self {
            title: SYNC_COMPLETED_TITLE.to_string(),
            body: SYNC_COMPLETED_BODY.to_string(),
        }
    }
}

/// System notification surface
pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    fn show(&self, notification: &Notification);
}

/// Show `notification` only when the user granted permission
pub fn notify_if_permitted(notifier: &dyn Notifier, notification: &Notification) {
    if notifier.permission().is_granted() {
        notifier.show(notification);
    } else {
        tracing::debug!(
            title = %notification.title,
            "Notification suppressed without permission"
        );
    }
}

/// Headless presenter that keeps everything it was shown
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryPresenter {
    state: Mutex<MemoryState>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct MemoryState {
    list: ReportList,
    errors: Vec<String>,
    banners: Vec<Connectivity>,
}

#[cfg(test)]
impl MemoryPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ListEntry> {
        self.with_state(|state| state.list.entries().to_vec())
    }

    pub fn errors(&self) -> Vec<String> {
        self.with_state(|state| state.errors.clone())
    }

    pub fn banners(&self) -> Vec<Connectivity> {
        self.with_state(|state| state.banners.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
impl Presenter for MemoryPresenter {
    fn show_record(&self, record: &DeliveryRecord) {
        self.with_state(|state| {
            state.list.push_record(record);
        });
    }

    fn show_placeholder(&self, item: &QueueItem, staged_at: DateTime<Utc>) {
        self.with_state(|state| {
            state.list.push_placeholder(item, staged_at);
        });
    }

    fn show_error(&self, message: &str) {
        self.with_state(|state| state.errors.push(message.to_string()));
    }

    fn show_connectivity(&self, connectivity: Connectivity) {
        self.with_state(|state| state.banners.push(connectivity));
    }
}

/// Notifier that records what it showed
#[derive(Debug)]
pub struct MemoryNotifier {
    permission: NotificationPermission,
    shown: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub const fn new(permission: NotificationPermission) -> Self {
        Self {
            permission,
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for MemoryNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn show(&self, notification: &Notification) {
        self.shown
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notification.clone());
    }
}
