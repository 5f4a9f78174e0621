//! Service configuration types.

use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Where restaurant rows come from.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Refresh cadence.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Per-coordinate result cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Feed source. `path` takes precedence over `url` when both are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// CSV document URL.
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Local CSV file, mostly for development.
    #[serde(default)]
    pub path: Option<String>,

    /// HTTP timeout for one fetch.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

/// Refresh timing (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
}

/// How cached results relate to store generations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Serve an entry only for the generation and UTC minute it was computed in.
    PerGeneration,
    /// Never invalidate; entries leave only through LRU eviction.
    Retain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    #[serde(default = "default_cache_policy")]
    pub policy: CachePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "0.0.0.0:8000".
    #[serde(default = "default_bind")]
    pub bind: String,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_feed_url() -> String {
    "https://s3.amazonaws.com/test.jampp.com/dmarasca/takehome.csv".into()
}
fn default_feed_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    6 * 60 * 60
}
fn default_cache_capacity() -> usize {
    1000
}
fn default_cache_policy() -> CachePolicy {
    CachePolicy::PerGeneration
}
fn default_bind() -> String {
    "0.0.0.0:8000".into()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            path: None,
            timeout_secs: default_feed_timeout(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            policy: default_cache_policy(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}
