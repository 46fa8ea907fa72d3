//! Query result storage.
//!
//! Holds `(tags, expiry, value)` entries in an LRU map together with the tag
//! index and the invalidation epochs used to reject fills that raced with an
//! invalidation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use lru::LruCache;

use super::config::CacheConfig;
use super::keys::{CacheTag, QueryKey};
use super::lock;
use super::registry::TagIndex;

/// Monotonic counter bumped by every invalidation.
pub type Epoch = u64;

pub(crate) type CachedValue = std::sync::Arc<dyn Any + Send + Sync>;

/// Number of per-tag epochs kept before they are folded into the floor.
const EPOCH_HISTORY_FACTOR: usize = 4;

struct CacheEntry {
    value: CachedValue,
    expires_at: DateTime<Utc>,
}

struct StoreState {
    entries: LruCache<QueryKey, CacheEntry>,
    index: TagIndex,
    tag_epochs: HashMap<CacheTag, Epoch>,
    /// Fills observed before this epoch are rejected regardless of tag.
    epoch_floor: Epoch,
}

pub(crate) enum Lookup {
    Hit(CachedValue),
    Expired,
    Missing,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FillOutcome {
    Stored { evicted: Option<QueryKey> },
    /// A tag of the entry was invalidated after the fill began.
    Superseded,
}

pub struct QueryStore {
    state: RwLock<StoreState>,
    epoch: AtomicU64,
    epoch_history: usize,
}

impl QueryStore {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.max_entries_non_zero();
        Self {
            state: RwLock::new(StoreState {
                entries: LruCache::new(capacity),
                index: TagIndex::new(),
                tag_epochs: HashMap::new(),
                epoch_floor: 0,
            }),
            epoch: AtomicU64::new(0),
            epoch_history: capacity.get().saturating_mul(EPOCH_HISTORY_FACTOR),
        }
    }

    /// Epoch a fill must capture before it starts computing.
    pub(crate) fn current_epoch(&self) -> Epoch {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn lookup(&self, key: &QueryKey, now: DateTime<Utc>) -> Lookup {
        let mut state = lock::write(&self.state, "lookup");
        match state.entries.get(key) {
            None => return Lookup::Missing,
            Some(entry) if entry.expires_at > now => return Lookup::Hit(entry.value.clone()),
            Some(_) => {}
        }
        state.entries.pop(key);
        state.index.unregister(key);
        Lookup::Expired
    }

    pub(crate) fn fill(
        &self,
        key: QueryKey,
        tags: &[CacheTag],
        value: CachedValue,
        expires_at: DateTime<Utc>,
        observed: Epoch,
    ) -> FillOutcome {
        let mut guard = lock::write(&self.state, "fill");
        let state = &mut *guard;

        let superseded = observed < state.epoch_floor
            || tags.iter().any(|tag| {
                state
                    .tag_epochs
                    .get(tag)
                    .is_some_and(|invalidated| *invalidated > observed)
            });
        if superseded {
            return FillOutcome::Superseded;
        }

        let displaced = state
            .entries
            .push(key.clone(), CacheEntry { value, expires_at });
        let evicted = match displaced {
            Some((old_key, _)) if old_key != key => {
                state.index.unregister(&old_key);
                Some(old_key)
            }
            _ => None,
        };
        state.index.register(key, tags);

        FillOutcome::Stored { evicted }
    }

    /// Drops every entry registered under `tag` and returns how many were removed.
    pub(crate) fn invalidate(&self, tag: &CacheTag) -> usize {
        let mut guard = lock::write(&self.state, "invalidate");
        let state = &mut *guard;
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        if state.tag_epochs.len() >= self.epoch_history {
            state.tag_epochs.clear();
            state.epoch_floor = epoch;
        } else {
            state.tag_epochs.insert(*tag, epoch);
        }

        let keys = state.index.take_tag(tag);
        for key in &keys {
            state.entries.pop(key);
        }
        keys.len()
    }

    pub fn clear(&self) {
        let mut state = lock::write(&self.state, "clear");
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        state.entries.clear();
        state.index.clear();
        state.tag_epochs.clear();
        state.epoch_floor = epoch;
    }

    pub fn len(&self) -> usize {
        lock::read(&self.state, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tags currently linked to at least one entry.
    pub fn tag_count(&self) -> usize {
        lock::read(&self.state, "tag_count").index.tag_count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use uuid::Uuid;

    use super::*;

    fn store(max_entries: usize) -> QueryStore {
        QueryStore::new(&CacheConfig {
            max_entries,
            ..CacheConfig::default()
        })
    }

    fn value(n: u32) -> CachedValue {
        Arc::new(n)
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn read_u32(store: &QueryStore, key: &QueryKey, at: DateTime<Utc>) -> Option<u32> {
        match store.lookup(key, at) {
            Lookup::Hit(value) => value.downcast_ref::<u32>().copied(),
            _ => None,
        }
    }

    #[test]
    fn entries_expire_at_their_deadline() {
        let store = store(8);
        let key = QueryKey::AllSurveys;
        let expires = now() + TimeDelta::seconds(10);
        store.fill(key.clone(), &key.tags(), value(1), expires, store.current_epoch());

        assert_eq!(read_u32(&store, &key, now()), Some(1));
        assert!(matches!(store.lookup(&key, expires), Lookup::Expired));
        assert!(matches!(store.lookup(&key, expires), Lookup::Missing));
        assert_eq!(store.tag_count(), 0);
    }

    #[test]
    fn fill_started_before_invalidation_is_rejected() {
        let store = store(8);
        let key = QueryKey::CompletedResponseCount;
        let observed = store.current_epoch();

        store.invalidate(&CacheTag::CompletedResponses);
        let outcome = store.fill(
            key.clone(),
            &key.tags(),
            value(7),
            now() + TimeDelta::seconds(60),
            observed,
        );

        assert_eq!(outcome, FillOutcome::Superseded);
        assert!(store.is_empty());

        let fresh = store.current_epoch();
        let outcome = store.fill(
            key.clone(),
            &key.tags(),
            value(8),
            now() + TimeDelta::seconds(60),
            fresh,
        );
        assert!(matches!(outcome, FillOutcome::Stored { evicted: None }));
    }

    #[test]
    fn unrelated_invalidation_does_not_block_fill() {
        let store = store(8);
        let key = QueryKey::QuestionsBySurvey(Uuid::new_v4());
        let observed = store.current_epoch();
        store.invalidate(&CacheTag::Questions(Uuid::new_v4()));

        let outcome = store.fill(
            key.clone(),
            &key.tags(),
            value(1),
            now() + TimeDelta::seconds(60),
            observed,
        );
        assert!(matches!(outcome, FillOutcome::Stored { .. }));
    }

    #[test]
    fn capacity_eviction_unlinks_the_evicted_key() {
        let store = store(1);
        let first = QueryKey::SurveyById(Uuid::new_v4());
        let second = QueryKey::SurveyById(Uuid::new_v4());
        let later = now() + TimeDelta::seconds(60);

        store.fill(first.clone(), &first.tags(), value(1), later, 0);
        let outcome = store.fill(second.clone(), &second.tags(), value(2), later, 0);

        assert_eq!(
            outcome,
            FillOutcome::Stored {
                evicted: Some(first.clone())
            }
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.tag_count(), 1);
        assert!(matches!(store.lookup(&first, now()), Lookup::Missing));
    }

    #[test]
    fn epoch_history_folds_into_floor() {
        let store = store(1);
        for _ in 0..EPOCH_HISTORY_FACTOR + 1 {
            store.invalidate(&CacheTag::Survey(Uuid::new_v4()));
        }
        let stale = 0;
        let key = QueryKey::AllSurveys;
        let outcome = store.fill(
            key.clone(),
            &key.tags(),
            value(1),
            now() + TimeDelta::seconds(60),
            stale,
        );
        assert_eq!(outcome, FillOutcome::Superseded);
    }
}
