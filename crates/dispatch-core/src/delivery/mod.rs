//! Delivery of single reports to the remote save endpoint.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{DeliveryRecord, SaveRequest, SaveResponse};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Path of the save endpoint relative to the API base URL
pub const SAVE_PATH: &str = "/api/save";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid delivery configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Delivery request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Save endpoint returned {0}")]
    Status(String),
    #[error("Save endpoint rejected the report: {0}")]
    Rejected(String),
    #[error("Malformed save response: {0}")]
    MalformedResponse(String),
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Sends one report to the remote store.
///
/// Implementations make exactly one attempt per call; retry policy belongs to
/// the caller.
pub trait DeliveryClient: Send + Sync {
    fn deliver(&self, payload: &str) -> impl Future<Output = DeliveryResult<DeliveryRecord>> + Send;
}

impl<T: DeliveryClient> DeliveryClient for Arc<T> {
    fn deliver(&self, payload: &str) -> impl Future<Output = DeliveryResult<DeliveryRecord>> + Send {
        (**self).deliver(payload)
    }
}

/// `reqwest`-backed client for `POST /api/save`
#[derive(Clone, Debug)]
pub struct HttpDeliveryClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpDeliveryClient {
    /// Build a client for the API at `base_url` (scheme required)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DeliveryResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            endpoint: format!("{base_url}{SAVE_PATH}"),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl DeliveryClient for HttpDeliveryClient {
    async fn deliver(&self, payload: &str) -> DeliveryResult<DeliveryRecord> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&SaveRequest {
                text: payload.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DeliveryError::Status(parse_api_error(status, &body)));
        }

        let envelope = serde_json::from_str::<SaveResponse>(&body)
            .map_err(|error| DeliveryError::MalformedResponse(error.to_string()))?;

        if !envelope.success {
            return Err(DeliveryError::Rejected(
                envelope
                    .error
                    .unwrap_or_else(|| "no error message".to_string()),
            ));
        }

        let record = envelope.data.ok_or_else(|| {
            DeliveryError::MalformedResponse("response did not include data".to_string())
        })?;
        tracing::debug!(id = %record.id, "Report delivered");
        Ok(record)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

pub(crate) fn normalize_base_url(raw: String) -> DeliveryResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        DeliveryError::InvalidConfiguration("API base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(DeliveryError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}
