//! Test doubles shared by the unit tests

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::delivery::{DeliveryClient, DeliveryError, DeliveryResult};
use crate::models::DeliveryRecord;

/// In-process delivery client that records every attempt
#[derive(Debug, Default)]
pub struct FakeDelivery {
    fail_on: Option<String>,
    delay: Option<Duration>,
    attempts: Mutex<Vec<String>>,
    delivered: Mutex<Vec<String>>,
}

impl FakeDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(payload: &str) -> Self {
        Self {
            fail_on: Some(payload.to_string()),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

impl DeliveryClient for FakeDelivery {
    async fn deliver(&self, payload: &str) -> DeliveryResult<DeliveryRecord> {
        self.attempts.lock().unwrap().push(payload.to_string());
        tokio::task::yield_now().await;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_on.as_deref() == Some(payload) {
            return Err(DeliveryError::Status("HTTP 503".to_string()));
        }

        self.delivered.lock().unwrap().push(payload.to_string());
        Ok(DeliveryRecord {
            text: payload.to_string(),
            date: Utc::now(),
            id: Uuid::now_v7().to_string(),
        })
    }
}
