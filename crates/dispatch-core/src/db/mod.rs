//! Local store for Dispatch

mod connection;
mod lease;
mod migrations;
mod queue;
mod registrations;

pub use connection::Database;
pub use lease::{LeaseInfo, LeaseStore};
pub use queue::QueueStore;
pub use registrations::{SyncRegistration, SyncRegistry, SYNC_TAG};
