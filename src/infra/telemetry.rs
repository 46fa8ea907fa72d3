use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_EVICT, METRIC_CACHE_FILL_MS, METRIC_CACHE_FILL_SKIPPED, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const METRIC_GENERATION_TOTAL: &str = "canvass_generation_total";
pub const METRIC_RATE_LIMITED_TOTAL: &str = "canvass_rate_limited_total";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Query cache hits, labelled by query family."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Query cache misses, including expired entries."
        );
        describe_counter!(
            METRIC_CACHE_EVICT,
            Unit::Count,
            "Query cache entries evicted due to capacity."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATE,
            Unit::Count,
            "Query cache entries dropped by tag invalidation."
        );
        describe_counter!(
            METRIC_CACHE_FILL_SKIPPED,
            Unit::Count,
            "Computed results not stored because an invalidation overtook them."
        );
        describe_histogram!(
            METRIC_CACHE_FILL_MS,
            Unit::Milliseconds,
            "Latency of the underlying read on a cache miss."
        );
        describe_counter!(
            METRIC_GENERATION_TOTAL,
            Unit::Count,
            "Survey generation requests, labelled by outcome."
        );
        describe_counter!(
            METRIC_RATE_LIMITED_TOTAL,
            Unit::Count,
            "Requests rejected by the rate limiter."
        );
    });
}
