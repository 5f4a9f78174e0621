//! Point queries: which restaurants can deliver to a coordinate right now.

use std::sync::Arc;

use chrono::NaiveTime;
use common::{Error, QueryResult};
use tracing::error;

use crate::geometry::distance_km;
use crate::handle::StoreHandle;
use crate::store::Store;

/// Restaurants in `store` that deliver to (lat, lon) and are open at `now`.
///
/// Ids come back in index retrieval order, which is not sorted. Never fails:
/// non-finite coordinates and missing records just produce fewer matches.
pub fn query_at(store: &Store, lat: f64, lon: f64, now: NaiveTime) -> QueryResult {
    if !lat.is_finite() || !lon.is_finite() {
        return QueryResult::empty();
    }

    let mut ids = Vec::new();
    for id in store.candidates(lat, lon) {
        let Some(restaurant) = store.get(id) else {
            error!(
                "Indexed restaurant {} missing from generation {} records",
                id,
                store.generation()
            );
            continue;
        };

        let distance = distance_km(lat, lon, restaurant.latitude, restaurant.longitude);
        if distance > restaurant.availability_radius {
            continue;
        }
        if !restaurant.is_open_at(now) {
            continue;
        }
        ids.push(id);
    }

    QueryResult::from_ids(ids)
}

/// Runs point queries against whatever store is currently published.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    handle: StoreHandle,
}

impl QueryEngine {
    pub fn new(handle: StoreHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    /// The store queries should run against. Fails only before the first load.
    pub fn current(&self) -> Result<Arc<Store>, Error> {
        self.handle.load().ok_or(Error::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::bounding_box;
    use crate::test_support::{make_restaurant, with_hours};
    use std::collections::HashSet;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn id_set(result: &QueryResult) -> HashSet<i64> {
        result.ids.iter().copied().collect()
    }

    #[test]
    fn test_open_restaurant_at_own_location_matches() {
        let r = with_hours(make_restaurant(999, 10.0, 10.0, 5.0), at(11, 0), at(13, 0));
        let store = Store::from_restaurants(vec![r]);
        let result = query_at(&store, 10.0, 10.0, at(12, 0));
        assert_eq!(result, QueryResult { count: 1, ids: vec![999] });
    }

    #[test]
    fn test_closed_restaurant_excluded() {
        let r = with_hours(make_restaurant(999, 10.0, 10.0, 5.0), at(13, 0), at(14, 0));
        let store = Store::from_restaurants(vec![r]);
        let result = query_at(&store, 10.0, 10.0, at(12, 0));
        assert_eq!(result, QueryResult { count: 0, ids: vec![] });
    }

    #[test]
    fn test_same_location_only_open_one_matches() {
        let open = with_hours(make_restaurant(1, 12.0, 12.5, 5.0), at(8, 0), at(20, 0));
        let closed = with_hours(make_restaurant(2, 12.0, 12.5, 5.0), at(20, 0), at(23, 0));
        let store = Store::from_restaurants(vec![open, closed]);
        let result = query_at(&store, 12.0, 12.5, at(12, 0));
        assert_eq!(result.count, 1);
        assert_eq!(result.ids, vec![1]);
    }

    #[test]
    fn test_midnight_crossing_hours_never_match() {
        let r = with_hours(make_restaurant(5, 0.0, 0.0, 5.0), at(22, 0), at(2, 0));
        let store = Store::from_restaurants(vec![r]);
        assert_eq!(query_at(&store, 0.0, 0.0, at(23, 30)).count, 0);
        assert_eq!(query_at(&store, 0.0, 0.0, at(1, 0)).count, 0);
    }

    #[test]
    fn test_empty_store_returns_empty() {
        let store = Store::empty();
        assert_eq!(query_at(&store, 0.0, 0.0, at(12, 0)), QueryResult::empty());
        assert_eq!(query_at(&store, -45.0, 170.0, at(0, 0)), QueryResult::empty());
    }

    #[test]
    fn test_box_corner_false_positive_filtered() {
        let store = Store::from_restaurants(vec![make_restaurant(1, 10.0, 10.0, 5.0)]);
        let bbox = bounding_box(10.0, 10.0, 5.0);
        let (lat, lon) = (bbox.max_lat - 1e-6, bbox.max_lon - 1e-6);
        assert_eq!(store.candidates(lat, lon).count(), 1, "corner is a candidate");
        assert_eq!(query_at(&store, lat, lon, at(12, 0)).count, 0, "but not a match");
    }

    #[test]
    fn test_radius_boundary() {
        let store = Store::from_restaurants(vec![make_restaurant(1, 0.0, 0.0, 10.0)]);
        // 0.08° of latitude ≈ 8.9 km, 0.1° ≈ 11.1 km.
        assert_eq!(query_at(&store, 0.08, 0.0, at(12, 0)).ids, vec![1]);
        assert!(query_at(&store, 0.1, 0.0, at(12, 0)).ids.is_empty());
    }

    #[test]
    fn test_matches_brute_force_predicate() {
        let mut restaurants = Vec::new();
        let mut id = 0;
        for i in 0..12 {
            for j in 0..12 {
                id += 1;
                let lat = -30.0 + i as f64 * 0.05;
                let lon = 150.0 + j as f64 * 0.05;
                let radius = 1.0 + (id % 7) as f64;
                let r = make_restaurant(id, lat, lon, radius);
                let r = if id % 3 == 0 {
                    with_hours(r, at(18, 0), at(22, 0))
                } else {
                    r
                };
                restaurants.push(r);
            }
        }
        let store = Store::from_restaurants(restaurants.clone());
        let now = at(12, 0);

        for (qlat, qlon) in [(-29.8, 150.2), (-30.0, 150.0), (-29.5, 150.55), (-31.0, 149.0)] {
            let expected: HashSet<i64> = restaurants
                .iter()
                .filter(|r| {
                    distance_km(qlat, qlon, r.latitude, r.longitude) <= r.availability_radius
                        && r.is_open_at(now)
                })
                .map(|r| r.id)
                .collect();
            let result = query_at(&store, qlat, qlon, now);
            assert_eq!(result.count, result.ids.len());
            assert_eq!(id_set(&result), expected, "mismatch at ({}, {})", qlat, qlon);
        }
    }

    #[test]
    fn test_repeated_queries_are_deterministic() {
        let store = Store::from_restaurants(
            (1..50).map(|i| make_restaurant(i, 10.0 + i as f64 * 0.01, 10.0, 5.0)),
        );
        let first = query_at(&store, 10.2, 10.0, at(9, 30));
        for _ in 0..10 {
            assert_eq!(query_at(&store, 10.2, 10.0, at(9, 30)), first);
        }
    }

    #[test]
    fn test_missing_record_is_skipped() {
        let store = Store::from_restaurants(vec![make_restaurant(1, 10.0, 10.0, 5.0)])
            .with_orphan_index_entry(77, bounding_box(10.0, 10.0, 5.0));
        let result = query_at(&store, 10.0, 10.0, at(12, 0));
        assert_eq!(result.ids, vec![1]);
    }

    #[test]
    fn test_non_finite_coordinates_return_empty() {
        let store = Store::from_restaurants(vec![make_restaurant(1, 0.0, 0.0, 5.0)]);
        assert_eq!(query_at(&store, f64::NAN, 0.0, at(12, 0)).count, 0);
        assert_eq!(query_at(&store, 0.0, f64::INFINITY, at(12, 0)).count, 0);
    }

    #[test]
    fn test_engine_not_ready_before_first_load() {
        let engine = QueryEngine::new(StoreHandle::new());
        assert!(matches!(engine.current(), Err(Error::NotReady)));

        engine.handle().publish(Store::empty());
        let store = engine.current().unwrap();
        assert_eq!(query_at(&store, 0.0, 0.0, at(12, 0)), QueryResult::empty());
    }

    #[test]
    fn test_engine_follows_published_generation() {
        let handle = StoreHandle::new();
        let engine = QueryEngine::new(handle.clone());
        handle.publish(Store::from_restaurants(vec![make_restaurant(1, 10.0, 10.0, 5.0)]));
        let first = engine.current().unwrap();
        assert_eq!(query_at(&first, 10.0, 10.0, at(12, 0)).ids, vec![1]);

        handle.publish(Store::from_restaurants(vec![make_restaurant(2, 10.0, 10.0, 5.0)]));
        let second = engine.current().unwrap();
        assert_eq!(query_at(&second, 10.0, 10.0, at(12, 0)).ids, vec![2]);
        assert_eq!(query_at(&first, 10.0, 10.0, at(12, 0)).ids, vec![1], "old snapshot unchanged");
    }
}
