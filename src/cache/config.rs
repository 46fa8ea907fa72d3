//! Cache configuration.
//!
//! Sizes the query store and holds the TTL for each staleness class.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use super::keys::CacheDuration;

const DEFAULT_MAX_ENTRIES: usize = 1_000;
const DEFAULT_SHORT_TTL_SECS: u64 = 60;
const DEFAULT_MEDIUM_TTL_SECS: u64 = 300;
const DEFAULT_LONG_TTL_SECS: u64 = 3_600;
const DEFAULT_VERY_LONG_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every read goes straight to the store.
    pub enabled: bool,
    /// Upper bound on cached query results; least recently used go first.
    pub max_entries: usize,
    pub short_ttl_secs: u64,
    pub medium_ttl_secs: u64,
    pub long_ttl_secs: u64,
    pub very_long_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_ENTRIES,
            short_ttl_secs: DEFAULT_SHORT_TTL_SECS,
            medium_ttl_secs: DEFAULT_MEDIUM_TTL_SECS,
            long_ttl_secs: DEFAULT_LONG_TTL_SECS,
            very_long_ttl_secs: DEFAULT_VERY_LONG_TTL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_entries: settings.max_entries.get(),
            short_ttl_secs: settings.short_ttl.as_secs(),
            medium_ttl_secs: settings.medium_ttl.as_secs(),
            long_ttl_secs: settings.long_ttl.as_secs(),
            very_long_ttl_secs: settings.very_long_ttl.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn ttl(&self, class: CacheDuration) -> Duration {
        let secs = match class {
            CacheDuration::Short => self.short_ttl_secs,
            CacheDuration::Medium => self.medium_ttl_secs,
            CacheDuration::Long => self.long_ttl_secs,
            CacheDuration::VeryLong => self.very_long_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    /// Returns the entry bound, clamping zero to one.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_staleness_ladder() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.ttl(CacheDuration::Short), Duration::from_secs(60));
        assert_eq!(config.ttl(CacheDuration::Medium), Duration::from_secs(300));
        assert_eq!(config.ttl(CacheDuration::Long), Duration::from_secs(3_600));
        assert_eq!(config.ttl(CacheDuration::VeryLong), Duration::from_secs(86_400));
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let config = CacheConfig {
            max_entries: 0,
            ..CacheConfig::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"short_ttl_secs": 5}"#).expect("partial config parses");
        assert_eq!(config.short_ttl_secs, 5);
        assert_eq!(config.medium_ttl_secs, DEFAULT_MEDIUM_TTL_SECS);
    }
}
