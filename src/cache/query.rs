//! Read-through access to the query store.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use metrics::{counter, histogram};
use mockable::{Clock, DefaultClock};
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::{CacheTag, QueryKey};
use super::store::{FillOutcome, Lookup, QueryStore};

pub const METRIC_CACHE_HIT: &str = "canvass_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "canvass_cache_miss_total";
pub const METRIC_CACHE_EVICT: &str = "canvass_cache_evict_total";
pub const METRIC_CACHE_INVALIDATE: &str = "canvass_cache_invalidate_total";
pub const METRIC_CACHE_FILL_SKIPPED: &str = "canvass_cache_fill_skipped_total";
pub const METRIC_CACHE_FILL_MS: &str = "canvass_cache_fill_ms";

/// Process-wide tagged cache in front of the repositories.
///
/// Concurrent misses for the same key each run their own computation; the
/// last one to finish replaces the stored entry. A computation that was in
/// flight when one of its tags got invalidated returns its value to its own
/// caller but is not stored.
pub struct QueryCache {
    config: CacheConfig,
    store: QueryStore,
    clock: Arc<dyn Clock>,
}

impl QueryCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let store = QueryStore::new(&config);
        Self {
            config,
            store,
            clock,
        }
    }

    pub fn with_system_clock(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(DefaultClock))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Runs `compute` through the cache using the key's own tags and TTL class.
    pub async fn cached<T, E, F, Fut>(&self, key: QueryKey, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let tags = key.tags();
        let ttl = self.config.ttl(key.duration());
        self.get_or_compute(key, &tags, ttl, compute).await
    }

    /// Returns the stored result for `key` or computes, stores and returns it.
    ///
    /// Errors from `compute` are returned unchanged and leave the store as it was.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: QueryKey,
        tags: &[CacheTag],
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        let family = key.family();
        if let Lookup::Hit(value) = self.store.lookup(&key, self.clock.utc()) {
            match value.downcast_ref::<T>() {
                Some(hit) => {
                    counter!(METRIC_CACHE_HIT, "family" => family).increment(1);
                    return Ok(hit.clone());
                }
                None => warn!(
                    target: "canvass::cache",
                    family,
                    "Cached value has an unexpected type, recomputing"
                ),
            }
        }
        counter!(METRIC_CACHE_MISS, "family" => family).increment(1);

        let observed = self.store.current_epoch();
        let read_at = self.clock.utc();
        let started = Instant::now();

        let value = compute().await?;

        histogram!(METRIC_CACHE_FILL_MS, "family" => family)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let expires_at = expiry(read_at, ttl);
        match self
            .store
            .fill(key, tags, Arc::new(value.clone()), expires_at, observed)
        {
            FillOutcome::Stored { evicted } => {
                if let Some(evicted) = evicted {
                    counter!(METRIC_CACHE_EVICT, "family" => evicted.family()).increment(1);
                }
            }
            FillOutcome::Superseded => {
                counter!(METRIC_CACHE_FILL_SKIPPED, "family" => family).increment(1);
                debug!(
                    target: "canvass::cache",
                    family,
                    "Skipped storing result invalidated while computing"
                );
            }
        }

        Ok(value)
    }

    pub fn invalidate(&self, tag: &CacheTag) -> usize {
        let removed = self.store.invalidate(tag);
        counter!(METRIC_CACHE_INVALIDATE).increment(1);
        debug!(target: "canvass::cache", tag = %tag, removed, "Invalidated cache tag");
        removed
    }

    pub fn invalidate_many<'a, I>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = &'a CacheTag>,
    {
        tags.into_iter().map(|tag| self.invalidate(tag)).sum()
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

fn expiry(read_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| read_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;
    use uuid::Uuid;

    use super::*;
    use crate::test_support::ManualClock;

    struct Counting {
        calls: AtomicUsize,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        async fn read(&self) -> Result<usize, String> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn cache_with_clock() -> (QueryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        (
            QueryCache::new(CacheConfig::default(), clock.clone()),
            clock,
        )
    }

    #[tokio::test]
    async fn invalidation_forces_recompute() {
        let (cache, _) = cache_with_clock();
        let source = Counting::new();
        let key = QueryKey::CompletedResponseCount;

        assert_eq!(cache.cached(key.clone(), || source.read()).await, Ok(1));
        assert_eq!(cache.cached(key.clone(), || source.read()).await, Ok(1));
        assert_eq!(source.calls(), 1);

        assert_eq!(cache.invalidate(&CacheTag::CompletedResponses), 1);

        assert_eq!(cache.cached(key.clone(), || source.read()).await, Ok(2));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn results_expire_after_ttl_without_invalidation() {
        let (cache, clock) = cache_with_clock();
        let source = Counting::new();
        let key = QueryKey::SurveysByActive(true);
        let ttl = Duration::from_secs(60);
        let tags = key.tags();

        cache
            .get_or_compute(key.clone(), &tags, ttl, || source.read())
            .await
            .unwrap();
        clock.advance(Duration::from_secs(59));
        cache
            .get_or_compute(key.clone(), &tags, ttl, || source.read())
            .await
            .unwrap();
        assert_eq!(source.calls(), 1);

        clock.advance(Duration::from_secs(1));
        let value = cache
            .get_or_compute(key.clone(), &tags, ttl, || source.read())
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn failed_reads_are_not_stored() {
        let (cache, _) = cache_with_clock();
        let key = QueryKey::AllSurveys;

        let failed: Result<u32, &str> = cache.cached(key.clone(), || async { Err("store down") }).await;
        assert_eq!(failed, Err("store down"));
        assert!(cache.is_empty());

        let ok: Result<u32, &str> = cache.cached(key.clone(), || async { Ok(3) }).await;
        assert_eq!(ok, Ok(3));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_read_leaves_other_entries_untouched() {
        let (cache, _) = cache_with_clock();
        let source = Counting::new();
        let healthy = QueryKey::AllSurveys;
        let failing = QueryKey::SurveyById(Uuid::new_v4());

        cache.cached(healthy.clone(), || source.read()).await.unwrap();
        let failed: Result<usize, String> = cache
            .cached(failing, || async { Err("timeout".to_string()) })
            .await;
        assert!(failed.is_err());

        assert_eq!(cache.cached(healthy, || source.read()).await, Ok(1));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn disabled_cache_always_computes() {
        let cache = QueryCache::new(CacheConfig::disabled(), Arc::new(ManualClock::at_epoch()));
        let source = Counting::new();
        for _ in 0..3 {
            cache
                .cached(QueryKey::AllSurveys, || source.read())
                .await
                .unwrap();
        }
        assert_eq!(source.calls(), 3);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn read_in_flight_during_invalidation_is_not_stored() {
        let (cache, _) = cache_with_clock();
        let key = QueryKey::ResponsesBySurvey(Uuid::new_v4());
        let survey_tag = key.tags()[0];
        let (release, gate) = oneshot::channel::<()>();

        let slow_read = cache.cached(key.clone(), || async move {
            let _ = gate.await;
            Ok::<_, ()>("before write")
        });
        let writer = async {
            tokio::task::yield_now().await;
            cache.invalidate(&survey_tag);
            let _ = release.send(());
        };
        let (stale, ()) = tokio::join!(slow_read, writer);

        assert_eq!(stale, Ok("before write"));
        let fresh = cache
            .cached(key.clone(), || async { Ok::<_, ()>("after write") })
            .await;
        assert_eq!(fresh, Ok("after write"));
    }

    #[tokio::test]
    async fn concurrent_fills_keep_the_last_result() {
        let (cache, _) = cache_with_clock();
        let key = QueryKey::UserById(Uuid::new_v4());
        let (release_first, first_gate) = oneshot::channel::<()>();

        let first = cache.cached(key.clone(), || async move {
            let _ = first_gate.await;
            Ok::<_, ()>(1)
        });
        let second = async {
            let value = cache.cached(key.clone(), || async { Ok::<_, ()>(2) }).await;
            let _ = release_first.send(());
            value
        };
        let (first, second) = tokio::join!(first, second);
        assert_eq!((first, second), (Ok(1), Ok(2)));

        let stored = cache
            .cached(key, || async { Ok::<_, ()>(99) })
            .await;
        assert_eq!(stored, Ok(1));
    }
}
