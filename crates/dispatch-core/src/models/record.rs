//! Wire types shared by the delivery client and the save endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A report as stored by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Submitted text
    pub text: String,
    /// Server-assigned insertion time
    pub date: DateTime<Utc>,
    /// Server-assigned identifier
    #[serde(rename = "_id")]
    pub id: String,
}

/// Body of `POST /api/save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub text: String,
}

/// Envelope returned by `POST /api/save` for both outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DeliveryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveResponse {
    pub const fn saved(record: DeliveryRecord) -> Self {
        Self {
            success: true,
            data: Some(record),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
