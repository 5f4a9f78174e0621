//! Geospatial availability engine.
//!
//! Holds one immutable generation of restaurant data at a time, answers
//! point queries against it, and swaps in new generations from the feed
//! without blocking readers.

pub mod cache;
pub mod geometry;
pub mod handle;
pub mod query;
pub mod refresh;
pub mod service;
pub mod store;

pub use cache::{CacheStamp, CacheStats, CoordKey, ResultCache};
pub use geometry::{bounding_box, distance_km, BoundingBox};
pub use handle::StoreHandle;
pub use query::{query_at, QueryEngine};
pub use refresh::{RefreshController, RefreshState, RefreshStats};
pub use service::AvailabilityService;
pub use store::Store;
