use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use dispatch_core::db::Database;
use dispatch_core::presentation::Notifier;
use dispatch_core::{
    ClientConfig, Connectivity, ConnectivityProbe, HttpDeliveryClient, QueueItem, Synchronizer,
};
use serde::Serialize;

use crate::error::CliError;
use crate::terminal::TerminalNotifier;

const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Serialize)]
pub struct PendingListItem {
    pub sequence: i64,
    pub preview: String,
    pub payload: String,
}

/// Environment config with command-line overrides applied
pub fn resolve_config(
    db_path: Option<PathBuf>,
    api_url: Option<String>,
) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(path) = db_path {
        config = config.with_db_path(path);
    }
    if let Some(url) = api_url {
        config = config.with_api_base_url(url)?;
    }
    Ok(config)
}

pub async fn open_database(config: &ClientConfig) -> Result<Database, CliError> {
    Ok(Database::open(&config.db_path).await?)
}

pub fn delivery_client(config: &ClientConfig) -> Result<HttpDeliveryClient, CliError> {
    Ok(HttpDeliveryClient::new(
        config.api_base_url.clone(),
        config.request_timeout,
    )?)
}

pub fn connectivity_probe(config: &ClientConfig) -> Result<ConnectivityProbe, CliError> {
    ConnectivityProbe::new(config.health_endpoint(), config.request_timeout)
        .map_err(|error| CliError::HttpClient(error.to_string()))
}

pub async fn probe_once(config: &ClientConfig) -> Result<Connectivity, CliError> {
    Ok(connectivity_probe(config)?.check().await)
}

pub fn notifier(config: &ClientConfig) -> Arc<dyn Notifier> {
    Arc::new(TerminalNotifier::new(config.notifications))
}

pub fn synchronizer(
    config: &ClientConfig,
    db: &Database,
    context: &str,
) -> Result<Synchronizer<HttpDeliveryClient>, CliError> {
    Ok(
        Synchronizer::new(db, delivery_client(config)?, notifier(config), context)
            .with_lease_ttl(config.drain_lease_ttl),
    )
}

/// Report text from arguments, falling back to piped stdin
pub fn resolve_report_text(parts: &[String]) -> Result<String, CliError> {
    if let Some(text) = normalize_report_text(&parts.join(" ")) {
        return Ok(text);
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_report_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_report_text(&buffer))
}

pub fn format_pending_lines(items: &[QueueItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| format!("#{:<5} {}", item.sequence, item.preview(PREVIEW_CHARS)))
        .collect()
}

pub fn pending_to_list_item(item: &QueueItem) -> PendingListItem {
    PendingListItem {
        sequence: item.sequence,
        preview: item.preview(PREVIEW_CHARS),
        payload: item.payload.clone(),
    }
}
