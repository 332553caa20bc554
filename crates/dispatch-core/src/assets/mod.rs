//! Versioned cache of the static client assets.
//!
//! Assets are fetched network-first; the cached copy is only used when the
//! network request fails.

use std::fmt;
use std::time::Duration;

use libsql::params;

use crate::db::Database;
use crate::delivery::normalize_base_url;
use crate::error::{Error, Result};
use crate::util::unix_millis_now;

/// Paths pre-cached on install
pub const DEFAULT_MANIFEST: &[&str] = &["/", "/index.html", "/app.js", "/manifest.json"];

/// Paths that are always fetched from the network
const NETWORK_ONLY: &[&str] = &["/manifest.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Network,
    Cache,
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub path: String,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub source: AssetSource,
}

#[derive(Clone)]
pub struct AssetCache {
    db: Database,
    client: reqwest::Client,
    base_url: String,
    cache_name: String,
}

impl AssetCache {
    pub fn new(
        db: Database,
        base_url: impl Into<String>,
        cache_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())
            .map_err(|error| Error::InvalidInput(error.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("HTTP client: {error}")))?;

        Ok(Self {
            db,
            client,
            base_url,
            cache_name: cache_name.into(),
        })
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Fetch and store every path in `manifest` under the current cache name.
    ///
    /// Nothing is written unless every path was fetched.
    pub async fn install(&self, manifest: &[&str]) -> Result<usize> {
        let mut fetched = Vec::with_capacity(manifest.len());
        for path in manifest {
            let (body, content_type) = self
                .fetch_network(path)
                .await
                .map_err(|error| Error::AssetUnavailable(format!("{path}: {error}")))?;
            fetched.push((*path, body, content_type));
        }

        let cached_at = unix_millis_now();
        let conn = self.db.connection().await;
        let tx = conn.transaction().await?;
        for (path, body, content_type) in &fetched {
            tx.execute(
                "INSERT INTO asset_cache (cache_name, url, content_type, body, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(cache_name, url) DO UPDATE SET
                     content_type = excluded.content_type,
                     body = excluded.body,
                     cached_at = excluded.cached_at",
                params![
                    self.cache_name.as_str(),
                    *path,
                    content_type.clone(),
                    body.clone(),
                    cached_at
                ],
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(cache = %self.cache_name, count = fetched.len(), "Installed asset cache");
        Ok(fetched.len())
    }

    /// Drop every cache other than the current one
    pub async fn activate(&self) -> Result<u64> {
        let conn = self.db.connection().await;
        let purged = conn
            .execute(
                "DELETE FROM asset_cache WHERE cache_name != ?1",
                params![self.cache_name.as_str()],
            )
            .await?;

        tracing::info!(cache = %self.cache_name, purged, "Activated asset cache");
        Ok(purged)
    }

    /// Network first, falling back to the cached copy
    pub async fn fetch(&self, path: &str) -> Result<FetchedAsset> {
        let network_error = match self.fetch_network(path).await {
            Ok((body, content_type)) => {
                return Ok(FetchedAsset {
                    path: path.to_string(),
                    body,
                    content_type,
                    source: AssetSource::Network,
                })
            }
            Err(error) => error,
        };

        if NETWORK_ONLY.contains(&path) {
            return Err(Error::AssetUnavailable(format!("{path}: {network_error}")));
        }

        tracing::debug!(path, "Network fetch failed, trying cache: {network_error}");
        match self.cached(path).await? {
            Some((body, content_type)) => Ok(FetchedAsset {
                path: path.to_string(),
                body,
                content_type,
                source: AssetSource::Cache,
            }),
            None => Err(Error::AssetUnavailable(format!(
                "{path}: {network_error}; not cached"
            ))),
        }
    }

    async fn cached(&self, path: &str) -> Result<Option<(Vec<u8>, Option<String>)>> {
        let conn = self.db.connection().await;
        let mut rows = conn
            .query(
                "SELECT body, content_type FROM asset_cache WHERE cache_name = ?1 AND url = ?2",
                params![self.cache_name.as_str(), path],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
            None => Ok(None),
        }
    }

    async fn fetch_network(&self, path: &str) -> std::result::Result<(Vec<u8>, Option<String>), String> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|error| error.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let body = response.bytes().await.map_err(|error| error.to_string())?;
        Ok((body.to_vec(), content_type))
    }
}
