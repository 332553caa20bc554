//! Data models for Dispatch

mod queue_item;
mod record;

pub use queue_item::QueueItem;
pub use record::{DeliveryRecord, SaveRequest, SaveResponse};
