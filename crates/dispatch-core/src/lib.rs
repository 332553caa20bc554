//! dispatch-core - Core library for Dispatch
//!
//! This crate contains the durable report queue, the delivery client, and the
//! drain protocol shared by the foreground and background contexts.

pub mod assets;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod delivery;
pub mod error;
pub mod models;
pub mod presentation;
pub mod submission;
pub mod sync;
pub mod util;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, ConfigError};
pub use connectivity::{Connectivity, ConnectivityMonitor, ConnectivityProbe};
pub use delivery::{DeliveryClient, DeliveryError, HttpDeliveryClient};
pub use error::{Error, Result};
pub use models::{DeliveryRecord, QueueItem, SaveRequest, SaveResponse};
pub use submission::{SubmissionOutcome, Submitter};
pub use sync::{DrainOutcome, Synchronizer};
