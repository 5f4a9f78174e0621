//! Periodic feed refresh with atomic store swap.
//!
//! Each cycle fetches the whole feed, builds a fresh [`Store`] on a blocking
//! thread and publishes it through the [`StoreHandle`]. A failed cycle
//! leaves the previously published store in place; there is no retry other
//! than the next tick.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::Error;
use feed_client::FeedSource;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::handle::StoreHandle;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    Idle,
    Refreshing,
}

impl RefreshState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => RefreshState::Refreshing,
            _ => RefreshState::Idle,
        }
    }
}

/// Refresh history since startup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStats {
    pub successes: u64,
    pub failures: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct RefreshController {
    feed: Arc<dyn FeedSource>,
    handle: StoreHandle,
    interval: Duration,
    state: AtomicU8,
    successes: AtomicU64,
    failures: AtomicU64,
    last_success_at: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
}

impl RefreshController {
    pub fn new(feed: Arc<dyn FeedSource>, handle: StoreHandle, interval: Duration) -> Self {
        Self {
            feed,
            handle,
            interval,
            state: AtomicU8::new(RefreshState::Idle as u8),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_success_at: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    pub fn state(&self) -> RefreshState {
        RefreshState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> RefreshStats {
        RefreshStats {
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_success_at: self.last_success_at.lock().ok().and_then(|g| *g),
            last_error: self.last_error.lock().ok().and_then(|g| g.clone()),
        }
    }

    /// Load the first generation. Callers must not serve queries if this fails.
    pub async fn initial_load(&self) -> Result<u64, Error> {
        info!("Initial restaurant load from {}", self.feed.describe());
        self.refresh_once().await
    }

    /// Run one fetch → build → publish cycle and return the new generation.
    ///
    /// On error nothing is published.
    pub async fn refresh_once(&self) -> Result<u64, Error> {
        self.state.store(RefreshState::Refreshing as u8, Ordering::Release);
        let outcome = self.fetch_and_build().await;
        let result = match outcome {
            Ok(store) => {
                let count = store.len();
                let generation = self.handle.publish(store);
                self.successes.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut at) = self.last_success_at.lock() {
                    *at = Some(Utc::now());
                }
                info!("Loaded {} restaurants (generation {})", count, generation);
                Ok(generation)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut last) = self.last_error.lock() {
                    *last = Some(e.to_string());
                }
                error!(
                    "Refresh from {} failed, keeping generation {:?}: {}",
                    self.feed.describe(),
                    self.handle.generation(),
                    e
                );
                Err(e)
            }
        };
        self.state.store(RefreshState::Idle as u8, Ordering::Release);
        result
    }

    async fn fetch_and_build(&self) -> Result<Store, Error> {
        let rows = self.feed.fetch().await?;
        tokio::task::spawn_blocking(move || Store::build(rows))
            .await
            .map_err(|e| Error::Other(format!("store build task failed: {}", e)))
    }

    /// Refresh every `interval` until `shutdown` turns true or its sender drops.
    ///
    /// The first refresh happens one full interval after the call; the
    /// initial load is expected to have run already.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!("Refresh loop started (every {}s)", self.interval.as_secs());
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are logged and counted inside; next tick retries.
                    let _ = self.refresh_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Refresh loop stopped");
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

impl std::fmt::Debug for RefreshController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshController")
            .field("feed", &self.feed.describe())
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish()
    }
}
