use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use canvass::cache::{
    CacheConfig, CacheTag, CacheTrigger, METRIC_CACHE_EVICT, METRIC_CACHE_FILL_MS,
    METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS, QueryCache, QueryKey,
};
use canvass::test_support::ManualClock;
use metrics_util::debugging::DebuggingRecorder;
use uuid::Uuid;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let config = CacheConfig {
        max_entries: 1,
        ..CacheConfig::default()
    };
    let cache = Arc::new(QueryCache::new(config, Arc::new(ManualClock::at_epoch())));
    let calls = Arc::new(AtomicUsize::new(0));

    let read = |key: QueryKey| {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        async move {
            cache
                .cached(key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(7_u64)
                })
                .await
        }
    };

    let survey = Uuid::new_v4();
    // miss, hit, then a second key evicts the first
    read(QueryKey::SurveyById(survey)).await.expect("fill");
    read(QueryKey::SurveyById(survey)).await.expect("hit");
    read(QueryKey::CompletedResponseCount).await.expect("evicting fill");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let trigger = CacheTrigger::new(cache.clone());
    trigger.response_completed(survey);
    assert!(cache.is_empty());
    assert_eq!(cache.invalidate(&CacheTag::Surveys), 0);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        METRIC_CACHE_HIT,
        METRIC_CACHE_MISS,
        METRIC_CACHE_EVICT,
        METRIC_CACHE_INVALIDATE,
        METRIC_CACHE_FILL_MS,
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
