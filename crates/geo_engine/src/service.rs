//! Query engine fronted by the result cache.

use chrono::{DateTime, Utc};
use common::config::CacheConfig;
use common::{Error, QueryResult};
use tracing::debug;

use crate::cache::{CacheStamp, CacheStats, CoordKey, ResultCache};
use crate::query::{query_at, QueryEngine};

/// Answers "who delivers here" for request handlers.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct AvailabilityService {
    engine: QueryEngine,
    cache: ResultCache,
}

impl AvailabilityService {
    pub fn new(engine: QueryEngine, cache: ResultCache) -> Self {
        Self { engine, cache }
    }

    pub fn from_config(engine: QueryEngine, cfg: &CacheConfig) -> Self {
        Self::new(engine, ResultCache::new(cfg.capacity, cfg.policy))
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Restaurants delivering to (lat, lon) now.
    pub fn restaurants_near(&self, lat: f64, lon: f64) -> Result<QueryResult, Error> {
        self.restaurants_near_at(lat, lon, Utc::now())
    }

    /// Same as [`Self::restaurants_near`] with an explicit clock.
    ///
    /// Fails with [`Error::NotReady`] only if no store was ever published.
    pub fn restaurants_near_at(
        &self,
        lat: f64,
        lon: f64,
        now: DateTime<Utc>,
    ) -> Result<QueryResult, Error> {
        let store = self.engine.current()?;
        let key = CoordKey::new(lat, lon);
        let stamp = CacheStamp {
            generation: store.generation(),
            minute: now.timestamp().div_euclid(60),
        };

        if let Some(hit) = self.cache.get(&key, stamp) {
            return Ok(hit);
        }

        // Cache lock is released here; the query runs unlocked.
        let result = query_at(&store, lat, lon, now.time());
        debug!(
            "Cache miss at ({}, {}): {} matches in generation {}",
            lat, lon, result.count, stamp.generation
        );
        self.cache.insert(key, stamp, result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::StoreHandle;
    use crate::store::Store;
    use crate::test_support::{make_restaurant, with_hours};
    use chrono::{NaiveTime, TimeZone};
    use common::config::CachePolicy;
    use std::sync::Arc;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn service(policy: CachePolicy) -> (StoreHandle, AvailabilityService) {
        let handle = StoreHandle::new();
        let svc = AvailabilityService::new(
            QueryEngine::new(handle.clone()),
            ResultCache::new(1000, policy),
        );
        (handle, svc)
    }

    #[test]
    fn test_not_ready_before_first_store() {
        let (_handle, svc) = service(CachePolicy::PerGeneration);
        assert!(matches!(svc.restaurants_near(1.0, 1.0), Err(Error::NotReady)));
    }

    #[test]
    fn test_second_identical_query_is_a_hit() {
        let (handle, svc) = service(CachePolicy::PerGeneration);
        handle.publish(Store::from_restaurants(vec![make_restaurant(1, 10.0, 10.0, 5.0)]));

        let first = svc.restaurants_near_at(10.0, 10.0, at(12, 0)).unwrap();
        let second = svc.restaurants_near_at(10.0, 10.0, at(12, 0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.ids, vec![1]);

        let stats = svc.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
    }

    #[test]
    fn test_per_generation_sees_refreshed_dataset() {
        let (handle, svc) = service(CachePolicy::PerGeneration);
        handle.publish(Store::from_restaurants(vec![make_restaurant(1, 10.0, 10.0, 5.0)]));
        assert_eq!(svc.restaurants_near_at(10.0, 10.0, at(12, 0)).unwrap().ids, vec![1]);

        handle.publish(Store::from_restaurants(vec![make_restaurant(2, 10.0, 10.0, 5.0)]));
        assert_eq!(svc.restaurants_near_at(10.0, 10.0, at(12, 0)).unwrap().ids, vec![2]);
    }

    #[test]
    fn test_per_generation_tracks_opening_hours() {
        let (handle, svc) = service(CachePolicy::PerGeneration);
        let r = with_hours(
            make_restaurant(1, 10.0, 10.0, 5.0),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
        );
        handle.publish(Store::from_restaurants(vec![r]));

        assert_eq!(svc.restaurants_near_at(10.0, 10.0, at(12, 10)).unwrap().count, 1);
        assert_eq!(svc.restaurants_near_at(10.0, 10.0, at(12, 45)).unwrap().count, 0);
    }

    #[test]
    fn test_retain_policy_keeps_pre_refresh_answer() {
        let (handle, svc) = service(CachePolicy::Retain);
        handle.publish(Store::from_restaurants(vec![make_restaurant(1, 10.0, 10.0, 5.0)]));
        assert_eq!(svc.restaurants_near_at(10.0, 10.0, at(12, 0)).unwrap().ids, vec![1]);

        handle.publish(Store::from_restaurants(vec![make_restaurant(2, 10.0, 10.0, 5.0)]));
        // Cached coordinate still answers from generation 1.
        assert_eq!(svc.restaurants_near_at(10.0, 10.0, at(12, 0)).unwrap().ids, vec![1]);
        // A new coordinate sees generation 2.
        assert_eq!(svc.restaurants_near_at(10.0, 10.001, at(12, 0)).unwrap().ids, vec![2]);
    }

    #[test]
    fn test_concurrent_queries_during_refresh() {
        let (handle, svc) = service(CachePolicy::PerGeneration);
        handle.publish(Store::from_restaurants(vec![make_restaurant(1, 0.0, 0.0, 5.0)]));
        let svc = Arc::new(svc);

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let svc = svc.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let lon = (w * 500 + i) as f64 * 1e-5;
                        let result = svc.restaurants_near_at(0.0, lon, at(12, 0)).unwrap();
                        assert_eq!(result.count, result.ids.len());
                        assert_eq!(result.count, 1);
                    }
                })
            })
            .collect();

        for g in 2..50 {
            handle.publish(Store::from_restaurants(vec![make_restaurant(g, 0.0, 0.0, 5.0)]));
        }
        for w in workers {
            w.join().unwrap();
        }
    }
}
