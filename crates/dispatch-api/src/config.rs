use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::pool::DatabaseTarget;

const REMOTE_SCHEMES: &[&str] = &["libsql://", "https://", "http://"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database: DatabaseTarget,
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "DISPATCH_API_BIND_ADDR", "127.0.0.1:8080");
        if bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(
                "DISPATCH_API_BIND_ADDR must be a socket address like 127.0.0.1:8080".to_string(),
            ));
        }

        let database_url =
            value_or_default(&lookup, "DISPATCH_DATABASE_URL", "dispatch-reports.db");
        let database = if REMOTE_SCHEMES
            .iter()
            .any(|scheme| database_url.starts_with(scheme))
        {
            DatabaseTarget::Remote {
                url: database_url,
                auth_token: required_trimmed(&lookup, "DISPATCH_DATABASE_AUTH_TOKEN")?,
            }
        } else {
            DatabaseTarget::Local(PathBuf::from(database_url))
        };

        let static_dir = optional_trimmed(&lookup, "DISPATCH_STATIC_DIR").map(PathBuf::from);

        Ok(Self {
            bind_addr,
            database,
            static_dir,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    dispatch_core::util::normalize_text_option(lookup(name))
}
