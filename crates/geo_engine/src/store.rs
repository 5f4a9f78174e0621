//! Immutable restaurant store: records plus an R-tree over their delivery boxes.
//!
//! A store is built once from a full feed and never mutated afterwards.
//! Refreshing means building a new store off to the side and publishing it
//! through a [`crate::StoreHandle`]; the R-tree is never edited in place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{RawRow, Restaurant, RestaurantId};
use rstar::{RTree, RTreeObject, AABB};
use tracing::{info, warn};

use crate::geometry::{bounding_box, BoundingBox};

/// Index entry: a restaurant's delivery box keyed by its id.
#[derive(Debug, Clone)]
pub struct IndexedBox {
    pub id: RestaurantId,
    pub bbox: BoundingBox,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min_lon, self.bbox.min_lat],
            [self.bbox.max_lon, self.bbox.max_lat],
        )
    }
}

/// One generation of restaurant data.
///
/// Every id in `index` has an entry in `records` and vice versa.
#[derive(Debug)]
pub struct Store {
    records: HashMap<RestaurantId, Restaurant>,
    index: RTree<IndexedBox>,
    generation: u64,
    built_at: DateTime<Utc>,
    skipped_rows: usize,
}

impl Store {
    /// A store with no restaurants.
    pub fn empty() -> Self {
        Self::from_restaurants(Vec::new())
    }

    /// Parse `rows` and index every restaurant that parses.
    ///
    /// Bad rows are logged and skipped; building never fails.
    pub fn build(rows: Vec<RawRow>) -> Self {
        let total = rows.len();
        let mut restaurants = Vec::with_capacity(total);
        let mut skipped = 0;

        for (idx, row) in rows.iter().enumerate() {
            match Restaurant::from_row(idx, row) {
                Ok(r) => restaurants.push(r),
                Err(e) => {
                    warn!("Error parsing row {}: {}", idx, e);
                    skipped += 1;
                }
            }
        }

        let mut store = Self::from_restaurants(restaurants);
        store.skipped_rows = skipped;
        info!(
            "Built store: {} restaurants from {} rows ({} skipped)",
            store.len(),
            total,
            skipped
        );
        store
    }

    /// Index already-parsed restaurants. A repeated id replaces the earlier one.
    pub fn from_restaurants(restaurants: impl IntoIterator<Item = Restaurant>) -> Self {
        let mut records: HashMap<RestaurantId, Restaurant> = HashMap::new();
        for r in restaurants {
            if let Some(prev) = records.insert(r.id, r) {
                warn!("Duplicate restaurant id {}: keeping the later row", prev.id);
            }
        }

        // Built from the de-duplicated map so index and records agree.
        let entries: Vec<IndexedBox> = records
            .values()
            .map(|r| IndexedBox {
                id: r.id,
                bbox: bounding_box(r.latitude, r.longitude, r.availability_radius),
            })
            .collect();

        Self {
            records,
            index: RTree::bulk_load(entries),
            generation: 0,
            built_at: Utc::now(),
            skipped_rows: 0,
        }
    }

    /// Ids whose delivery box contains (lat, lon), in index order.
    ///
    /// A superset of the restaurants that can actually deliver there.
    pub fn candidates(&self, lat: f64, lon: f64) -> impl Iterator<Item = RestaurantId> + '_ {
        let probe = AABB::from_point([lon, lat]);
        self.index
            .locate_in_envelope_intersecting(&probe)
            .map(|entry| entry.id)
    }

    pub fn get(&self, id: RestaurantId) -> Option<&Restaurant> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Rows dropped while building this store.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    #[cfg(test)]
    pub(crate) fn index_len(&self) -> usize {
        self.index.size()
    }

    /// Test-only constructor for a store whose index and records disagree.
    #[cfg(test)]
    pub(crate) fn with_orphan_index_entry(mut self, id: RestaurantId, bbox: BoundingBox) -> Self {
        self.index.insert(IndexedBox { id, bbox });
        self
    }
}
