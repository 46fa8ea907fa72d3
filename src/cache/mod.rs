//! Canvass query cache.
//!
//! A tagged read-through cache in front of the repositories:
//!
//! - [`QueryCache`] memoizes query results under a [`QueryKey`] with a set of
//!   [`CacheTag`]s and a TTL chosen by the key's staleness class.
//! - [`CacheTrigger`] turns committed writes ([`CacheEvent`]) into tag
//!   invalidations through an [`InvalidationPlan`].
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries = 1000
//! short_ttl_secs = 60
//! medium_ttl_secs = 300
//! long_ttl_secs = 3600
//! very_long_ttl_secs = 86400
//! ```
//!
//! No query family maps to the very-long class today, so its TTL has no
//! effect until one does.

mod config;
mod events;
mod keys;
mod lock;
mod planner;
mod query;
mod registry;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use events::CacheEvent;
pub use keys::{CacheDuration, CacheTag, QueryKey};
pub use planner::InvalidationPlan;
pub use query::{
    METRIC_CACHE_EVICT, METRIC_CACHE_FILL_MS, METRIC_CACHE_FILL_SKIPPED, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS, QueryCache,
};
pub use trigger::CacheTrigger;
