//! Terminal rendering of reports, banners and notifications

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dispatch_core::presentation::{
    Notification, NotificationPermission, Notifier, Presenter, ReportList,
};
use dispatch_core::{Connectivity, DeliveryRecord, QueueItem};

pub const fn connectivity_banner(connectivity: Connectivity) -> &'static str {
    match connectivity {
        Connectivity::Online => "Connected to the Internet",
        Connectivity::Offline => "No Internet connection",
    }
}

/// Prints each report as it is added to the session list
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    list: Mutex<ReportList>,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_list<T>(&self, f: impl FnOnce(&mut ReportList) -> T) -> T {
        let mut list = self
            .list
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut list)
    }
}

impl Presenter for TerminalPresenter {
    fn show_record(&self, record: &DeliveryRecord) {
        let line = self.with_list(|list| list.push_record(record).line());
        println!("{line}");
    }

    fn show_placeholder(&self, item: &QueueItem, staged_at: DateTime<Utc>) {
        let line = self.with_list(|list| list.push_placeholder(item, staged_at).line());
        println!("{line} [pending]");
    }

    fn show_error(&self, message: &str) {
        eprintln!("Error: {message}");
    }

    fn show_connectivity(&self, connectivity: Connectivity) {
        println!("{}", connectivity_banner(connectivity));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TerminalNotifier {
    permission: NotificationPermission,
}

impl TerminalNotifier {
    pub const fn new(permission: NotificationPermission) -> Self {
        Self { permission }
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn show(&self, notification: &Notification) {
        println!("{}: {}", notification.title, notification.body);
    }
}
