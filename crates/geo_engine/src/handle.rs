//! The "current store" reference shared by readers and the refresher.
//!
//! Readers take one atomic load per query and keep that `Arc<Store>` for
//! the rest of it; the refresher publishes with one atomic store. Neither
//! side ever waits on the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::store::Store;

/// Cloneable handle to the published store generation.
///
/// Empty until the first successful load.
#[derive(Debug, Clone, Default)]
pub struct StoreHandle {
    current: Arc<ArcSwapOption<Store>>,
    last_generation: Arc<AtomicU64>,
}

impl StoreHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current store, if one has been published.
    pub fn load(&self) -> Option<Arc<Store>> {
        self.current.load_full()
    }

    /// Stamp `store` with the next generation number and make it current.
    ///
    /// Returns the assigned generation. The previous store is dropped once
    /// the last in-flight reader releases it.
    pub fn publish(&self, mut store: Store) -> u64 {
        let generation = self.last_generation.fetch_add(1, Ordering::AcqRel) + 1;
        store.set_generation(generation);
        self.current.store(Some(Arc::new(store)));
        generation
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// Generation of the current store, if any.
    pub fn generation(&self) -> Option<u64> {
        self.load().map(|s| s.generation())
    }
}
