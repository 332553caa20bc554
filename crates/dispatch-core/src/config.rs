//! Client configuration shared by the foreground and background contexts.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::delivery::{normalize_base_url, SAVE_PATH};
use crate::presentation::NotificationPermission;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_ASSET_CACHE_NAME: &str = "dispatch-cache-v2";
const DB_FILE_NAME: &str = "dispatch.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub db_path: PathBuf,
    pub request_timeout: Duration,
    pub drain_lease_ttl: Duration,
    pub sync_budget: Duration,
    pub probe_interval: Duration,
    pub notifications: NotificationPermission,
    pub asset_cache_name: String,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = normalize_base_url(value_or_default(
            &lookup,
            "DISPATCH_API_BASE_URL",
            DEFAULT_API_BASE_URL,
        ))
        .map_err(|error| ConfigError::Invalid(format!("DISPATCH_API_BASE_URL: {error}")))?;

        let db_path = optional_trimmed(&lookup, "DISPATCH_DB_PATH")
            .map_or_else(default_db_path, PathBuf::from);

        let request_timeout = seconds_in_range(&lookup, "DISPATCH_REQUEST_TIMEOUT_SECS", 10, 1, 120)?;
        let drain_lease_ttl =
            seconds_in_range(&lookup, "DISPATCH_DRAIN_LEASE_TTL_SECS", 60, 5, 3_600)?;
        let sync_budget = seconds_in_range(&lookup, "DISPATCH_SYNC_BUDGET_SECS", 30, 1, 600)?;
        let probe_interval = seconds_in_range(&lookup, "DISPATCH_PROBE_INTERVAL_SECS", 5, 1, 300)?;

        let notifications = value_or_default(&lookup, "DISPATCH_NOTIFICATIONS", "default")
            .parse::<NotificationPermission>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "DISPATCH_NOTIFICATIONS must be one of granted, denied, default".to_string(),
                )
            })?;

        let asset_cache_name =
            value_or_default(&lookup, "DISPATCH_ASSET_CACHE_NAME", DEFAULT_ASSET_CACHE_NAME);

        Ok(Self {
            api_base_url,
            db_path,
            request_timeout,
            drain_lease_ttl,
            sync_budget,
            probe_interval,
            notifications,
            asset_cache_name,
        })
    }

    /// Replace the API base URL, validating it the same way as the env value
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(url.into())
            .map_err(|error| ConfigError::Invalid(format!("API base URL: {error}")))?;
        Ok(self)
    }

    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn save_endpoint(&self) -> String {
        format!("{}{SAVE_PATH}", self.api_base_url)
    }

    pub fn health_endpoint(&self) -> String {
        format!("{}/healthz", self.api_base_url)
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dispatch")
        .join(DB_FILE_NAME)
}

fn seconds_in_range(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = optional_trimmed(lookup, name) else {
        return Ok(Duration::from_secs(default));
    };
    let secs = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be an integer in [{min}, {max}]"))
    })?;
    if !(min..=max).contains(&secs) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{min}, {max}]"
        )));
    }
    Ok(Duration::from_secs(secs))
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    crate::util::normalize_text_option(lookup(name))
}
