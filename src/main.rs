//! delivery-radius: which restaurants can deliver to a coordinate right now.
//!
//! Single-binary Tokio application that:
//! 1. Loads the restaurant feed and builds the first store generation
//! 2. Refreshes the feed on a fixed interval, swapping generations atomically
//! 3. Serves point lookups over HTTP through a per-coordinate result cache

mod api;
mod config;
mod logging;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use feed_client::FeedSource;
use geo_engine::{AvailabilityService, QueryEngine, RefreshController, StoreHandle};

/// Restaurant delivery availability service
#[derive(Parser)]
#[command(name = "delivery-radius", about = "Restaurant delivery availability service")]
struct Cli {
    /// Path to a TOML config file (default: ./config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Load the feed once, report what was loaded, then exit.
    #[arg(long)]
    check_feed: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Also append logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = match logging::init_logging(cli.log_json, cli.log_file.as_deref()) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    info!("delivery-radius starting up...");

    // Load configuration.
    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let feed: Arc<dyn FeedSource> = match feed_client::from_config(&cfg.feed) {
        Ok(f) => Arc::from(f),
        Err(e) => {
            error!("Feed initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Refresh every {}s, cache capacity {} ({:?})",
        cfg.refresh.interval_secs, cfg.cache.capacity, cfg.cache.policy
    );

    // ── Shared state ─────────────────────────────────────────────────
    let handle = StoreHandle::new();
    let refresher = Arc::new(RefreshController::new(
        feed,
        handle.clone(),
        Duration::from_secs(cfg.refresh.interval_secs),
    ));

    // The service is not ready until the first generation is published.
    let generation = match refresher.initial_load().await {
        Ok(g) => g,
        Err(e) => {
            error!("Initial load failed, refusing to start: {}", e);
            std::process::exit(1);
        }
    };

    // ── Check-feed mode ──────────────────────────────────────────────
    if cli.check_feed {
        if let Some(store) = handle.load() {
            info!(
                "Feed OK: generation {} with {} restaurants ({} rows skipped)",
                generation,
                store.len(),
                store.skipped_rows()
            );
        }
        return;
    }

    let service = Arc::new(AvailabilityService::from_config(
        QueryEngine::new(handle.clone()),
        &cfg.cache,
    ));

    // ── Spawn tasks ──────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_handle = refresher.clone().spawn(shutdown_rx);

    let app = api::router(api::AppState {
        service,
        refresh: refresher.clone(),
    });

    let listener = match tokio::net::TcpListener::bind(&cfg.server.bind).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", cfg.server.bind, e);
            std::process::exit(1);
        }
    };
    info!("🚀 Listening on {}", cfg.server.bind);

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    });

    if let Err(e) = server.await {
        error!("HTTP server error: {}", e);
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = refresh_handle.await {
        error!("Refresh task exited abnormally: {:?}", e);
    }

    info!("delivery-radius shut down.");
}
