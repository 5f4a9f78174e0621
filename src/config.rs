//! Configuration loader: merges env vars, .env file, and config.toml.

use std::path::Path;

use common::config::{CachePolicy, ServiceConfig};
use common::Error;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_policy(raw: &str) -> Result<CachePolicy, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "per_generation" | "pergeneration" => Ok(CachePolicy::PerGeneration),
        "retain" => Ok(CachePolicy::Retain),
        _ => Err(Error::Config(
            "CACHE_POLICY must be one of: per_generation, retain".into(),
        )),
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    let has_path = config
        .feed
        .path
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());
    if !has_path && config.feed.url.trim().is_empty() {
        issues.push("feed.url or feed.path must be set".into());
    }
    if config.feed.timeout_secs == 0 {
        issues.push("feed.timeout_secs must be > 0".into());
    }
    if config.refresh.interval_secs == 0 {
        issues.push("refresh.interval_secs must be > 0".into());
    }
    if config.cache.capacity == 0 {
        issues.push("cache.capacity must be > 0".into());
    }
    if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
        issues.push(format!(
            "server.bind must be a socket address, got {:?}",
            config.server.bind
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply environment overrides on top of `config`.
fn apply_env(config: &mut ServiceConfig) -> Result<(), Error> {
    if let Ok(url) = std::env::var("FEED_URL") {
        config.feed.url = url;
    }
    if let Ok(path) = std::env::var("FEED_PATH") {
        config.feed.path = Some(path);
    }
    if let Ok(raw) = std::env::var("FEED_TIMEOUT_SECS") {
        config.feed.timeout_secs = parse_positive_u64(&raw, "FEED_TIMEOUT_SECS")?;
    }
    if let Ok(raw) = std::env::var("REFRESH_INTERVAL_SECS") {
        config.refresh.interval_secs = parse_positive_u64(&raw, "REFRESH_INTERVAL_SECS")?;
    }
    if let Ok(raw) = std::env::var("CACHE_CAPACITY") {
        config.cache.capacity = parse_positive_u64(&raw, "CACHE_CAPACITY")? as usize;
    }
    if let Ok(raw) = std::env::var("CACHE_POLICY") {
        config.cache.policy = parse_policy(&raw)?;
    }
    if let Ok(bind) = std::env::var("BIND_ADDR") {
        config.server.bind = bind;
    }
    Ok(())
}

/// Load service configuration from environment and an optional config file.
///
/// `path` defaults to `config.toml` in the working directory; a missing
/// default file is fine, a missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = ServiceConfig::default();

    // 3. Config file, if any.
    let config_path = path.unwrap_or_else(|| Path::new("config.toml"));
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = parse_toml(&contents)?;
    } else if path.is_some() {
        return Err(Error::Config(format!(
            "Config file {} not found",
            config_path.display()
        )));
    }

    // 4. Environment variables win.
    apply_env(&mut config)?;

    validate_config(&config)?;
    Ok(config)
}

fn parse_toml(contents: &str) -> Result<ServiceConfig, Error> {
    toml::from_str(contents).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}
