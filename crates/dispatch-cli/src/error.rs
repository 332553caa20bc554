use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] dispatch_core::Error),
    #[error(transparent)]
    Config(#[from] dispatch_core::ConfigError),
    #[error(transparent)]
    Delivery(#[from] dispatch_core::DeliveryError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No report text provided")]
    EmptyContent,
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
    #[error("Drain {0}")]
    DrainFailed(String),
}
