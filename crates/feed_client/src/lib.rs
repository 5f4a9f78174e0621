//! Restaurant feed client.
//!
//! Fetches the restaurant CSV document (over HTTP or from a local file)
//! and decodes it into raw rows. Turning a row into a `Restaurant` is left
//! to the store builder so that one bad row never fails a whole load.

pub mod decode;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use common::config::FeedConfig;
use common::{Error, RawRow};
use tracing::debug;

pub use decode::decode_csv;

/// A source of raw restaurant rows.
///
/// `fetch` fails only when the document as a whole is unavailable or
/// undecodable; individual malformed rows are still returned.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawRow>, Error>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

// ── HTTP ──────────────────────────────────────────────────────────────

/// Fetches the CSV document from a URL.
#[derive(Debug, Clone)]
pub struct HttpCsvFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpCsvFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("delivery-radius/0.1")
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build feed HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpCsvFeed {
    async fn fetch(&self) -> Result<Vec<RawRow>, Error> {
        debug!("Fetching restaurant feed: {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("error fetching {}: {}", self.url, e)))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Feed(format!(
                "{} returned {}: {}",
                self.url,
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("error reading body of {}: {}", self.url, e)))?;

        decode_csv(&bytes)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

// ── Local file ────────────────────────────────────────────────────────

/// Reads the CSV document from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileCsvFeed {
    path: PathBuf,
}

impl FileCsvFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileCsvFeed {
    async fn fetch(&self) -> Result<Vec<RawRow>, Error> {
        debug!("Reading restaurant feed: {}", self.path.display());
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::Feed(format!("error reading {}: {}", self.path.display(), e)))?;
        decode_csv(&bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Build the feed described by `cfg`. A configured `path` wins over `url`.
pub fn from_config(cfg: &FeedConfig) -> Result<Box<dyn FeedSource>, Error> {
    if let Some(path) = cfg.path.as_deref().filter(|p| !p.trim().is_empty()) {
        return Ok(Box::new(FileCsvFeed::new(path)));
    }
    if cfg.url.trim().is_empty() {
        return Err(Error::Config("feed.url or feed.path must be set".into()));
    }
    Ok(Box::new(HttpCsvFeed::new(
        cfg.url.trim(),
        Duration::from_secs(cfg.timeout_secs),
    )?))
}
