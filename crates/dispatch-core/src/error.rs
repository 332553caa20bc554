//! Error types for dispatch-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::delivery::DeliveryError;

/// Result type alias using dispatch-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dispatch-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The local store could not be opened or initialized
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A queued item could not be staged
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Staged items could not be read back
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Delivered items could not be removed from the store
    #[error("Clear failed: {0}")]
    ClearFailed(String),

    /// The remote store did not accept a report
    #[error("Delivery failed: {0}")]
    DeliveryFailed(#[from] DeliveryError),

    /// libSQL error outside the queue operations
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Client configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Asset neither reachable on the network nor cached
    #[error("Asset unavailable: {0}")]
    AssetUnavailable(String),
}

impl Error {
    pub(crate) fn storage_unavailable(error: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(error.to_string())
    }

    pub(crate) fn write_failed(error: impl std::fmt::Display) -> Self {
        Self::WriteFailed(error.to_string())
    }

    pub(crate) fn read_failed(error: impl std::fmt::Display) -> Self {
        Self::ReadFailed(error.to_string())
    }

    pub(crate) fn clear_failed(error: impl std::fmt::Display) -> Self {
        Self::ClearFailed(error.to_string())
    }
}
