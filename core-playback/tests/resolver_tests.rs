//! Tests for the stream resolver's attempt loop, driven by a scripted
//! loader instead of a rendering surface.

mod common;

use async_trait::async_trait;
use bridge_desktop::MemoryKeyValueStore;
use bridge_traits::SystemClock;
use common::{catalog_url, test_config, ScriptedCatalog, ScriptedHttp};
use core_async::sync::CancellationToken;
use core_playback::{
    AttemptLoader, AttemptOutcome, AudioQuality, FailureReason, PlaybackError, ResolveRequest,
    StreamCache, StreamResolver, StreamUrl, Telemetry,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
struct ScriptedLoader {
    outcomes: VecDeque<core_playback::Result<AttemptOutcome>>,
    urls: Vec<String>,
    failed: Vec<(u32, FailureReason)>,
}

impl ScriptedLoader {
    fn new(outcomes: impl IntoIterator<Item = core_playback::Result<AttemptOutcome>>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AttemptLoader for ScriptedLoader {
    async fn attempt(&mut self, _attempt: u32, url: &str) -> core_playback::Result<AttemptOutcome> {
        self.urls.push(url.to_string());
        self.outcomes
            .pop_front()
            .unwrap_or(Ok(AttemptOutcome::Sustained))
    }

    fn attempt_failed(&mut self, attempt: u32, error: &PlaybackError) {
        self.failed.push((attempt, error.failure_reason()));
    }
}

/// Never finishes an attempt.
struct HangingLoader;

#[async_trait]
impl AttemptLoader for HangingLoader {
    async fn attempt(&mut self, _attempt: u32, _url: &str) -> core_playback::Result<AttemptOutcome> {
        std::future::pending().await
    }
}

struct Fixture {
    resolver: StreamResolver,
    catalog: Arc<ScriptedCatalog>,
    http: Arc<ScriptedHttp>,
    cache: Arc<StreamCache>,
    telemetry: Arc<Telemetry>,
}

fn fixture_with(catalog: ScriptedCatalog, http: ScriptedHttp, probe: bool) -> Fixture {
    let config = Arc::new(test_config());
    let clock = Arc::new(SystemClock);
    let cache = Arc::new(StreamCache::new(
        Arc::new(MemoryKeyValueStore::new()),
        clock.clone(),
        config.cache_ttl,
        config.max_cache_failures,
    ));
    let telemetry = Arc::new(Telemetry::new(100, clock));
    let catalog = Arc::new(catalog);
    let http = Arc::new(http);
    let resolver = StreamResolver::new(
        catalog.clone(),
        cache.clone(),
        telemetry.clone(),
        config,
    )
    .with_http(http.clone(), probe);

    Fixture {
        resolver,
        catalog,
        http,
        cache,
        telemetry,
    }
}

fn fixture() -> Fixture {
    fixture_with(ScriptedCatalog::new(), ScriptedHttp::new(), false)
}

fn request() -> ResolveRequest {
    ResolveRequest::new("a", AudioQuality::High)
}

fn network() -> core_playback::Result<AttemptOutcome> {
    Err(PlaybackError::Network("media network error".to_string()))
}

#[tokio::test(start_paused = true)]
async fn test_backoff_between_attempts() {
    let f = fixture();
    let mut loader = ScriptedLoader::new([network(), network(), network()]);
    let started = Instant::now();

    let result = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await;

    assert_eq!(
        result,
        Err(PlaybackError::AttemptsExhausted {
            attempts: 3,
            last: Box::new(PlaybackError::Network("media network error".to_string())),
        })
    );
    // 100 ms before attempt 2, 200 ms before attempt 3.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(310));
    assert_eq!(
        loader.urls,
        (1..=3)
            .map(|n| catalog_url("a", AudioQuality::High, n))
            .collect::<Vec<_>>()
    );
    assert_eq!(
        loader.failed,
        vec![
            (1, FailureReason::Network),
            (2, FailureReason::Network),
            (3, FailureReason::Network),
        ]
    );

    let metrics = f.telemetry.metrics();
    assert_eq!(metrics.resolve_attempts, 3);
    assert_eq!(metrics.resolve_failures, 3);
    assert_eq!(metrics.error_rate, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_first_success_confirms_catalog_url() {
    let f = fixture();
    let mut loader = ScriptedLoader::default();

    let resolved = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolved.url, catalog_url("a", AudioQuality::High, 1));
    assert_eq!(resolved.attempts, 1);
    assert!(!resolved.from_cache);
    assert!(resolved.confirmed);

    let entry = f.cache.get("a", AudioQuality::High).await.unwrap();
    assert_eq!(entry.url, resolved.url);
    assert!(entry.confirmed);
}

#[tokio::test(start_paused = true)]
async fn test_cached_candidate_is_tried_first() {
    let f = fixture();
    f.cache
        .put("a", AudioQuality::High, &StreamUrl::new("https://cached.test/a"))
        .await;
    let expires_at = f.cache.get("a", AudioQuality::High).await.unwrap().expires_at;
    let mut loader = ScriptedLoader::default();

    let resolved = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolved.url, "https://cached.test/a");
    assert!(resolved.from_cache);
    assert_eq!(resolved.stream_url().expiry_hint, Some(expires_at));
    assert_eq!(f.catalog.calls("a"), 0);
    assert!(f.cache.get("a", AudioQuality::High).await.unwrap().confirmed);
}

#[tokio::test(start_paused = true)]
async fn test_skip_cache_goes_to_catalog() {
    let f = fixture();
    f.cache
        .put("a", AudioQuality::High, &StreamUrl::new("https://cached.test/a"))
        .await;
    let mut loader = ScriptedLoader::default();

    let resolved = f
        .resolver
        .resolve(
            &request().skip_cache(true),
            &mut loader,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(resolved.url, catalog_url("a", AudioQuality::High, 1));
    assert!(!resolved.from_cache);
    assert_eq!(loader.urls.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_cached_candidate_falls_back_to_catalog() {
    let f = fixture();
    f.cache
        .put("a", AudioQuality::High, &StreamUrl::new("https://cached.test/a"))
        .await;
    let mut loader = ScriptedLoader::new([network()]);

    let resolved = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        loader.urls,
        vec![
            "https://cached.test/a".to_string(),
            catalog_url("a", AudioQuality::High, 1),
        ]
    );
    assert_eq!(resolved.attempts, 2);
    assert!(!resolved.from_cache);
    assert_eq!(f.cache.stats().failures_recorded, 1);

    let entry = f.cache.get("a", AudioQuality::High).await.unwrap();
    assert_eq!(entry.url, resolved.url);
    assert_eq!(entry.failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_cached_failures_evict_entry() {
    let mut config = test_config();
    config.max_attempts = 1;
    let clock = Arc::new(SystemClock);
    let cache = Arc::new(StreamCache::new(
        Arc::new(MemoryKeyValueStore::new()),
        clock.clone(),
        config.cache_ttl,
        3,
    ));
    let resolver = StreamResolver::new(
        Arc::new(ScriptedCatalog::new()),
        cache.clone(),
        Arc::new(Telemetry::new(100, clock)),
        Arc::new(config),
    );
    cache
        .put("a", AudioQuality::High, &StreamUrl::new("https://cached.test/a"))
        .await;

    for expected in 1..=2 {
        let mut loader = ScriptedLoader::new([network()]);
        assert!(resolver
            .resolve(&request(), &mut loader, &CancellationToken::new())
            .await
            .is_err());
        assert_eq!(loader.urls, vec!["https://cached.test/a".to_string()]);
        let entry = cache.get("a", AudioQuality::High).await.unwrap();
        assert_eq!(entry.failure_count, expected);
    }

    let mut loader = ScriptedLoader::new([network()]);
    assert!(resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await
        .is_err());
    assert!(cache.get("a", AudioQuality::High).await.is_none());
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_ends_resolution() {
    let f = fixture();
    let mut loader = ScriptedLoader::new([Err(PlaybackError::PlaybackRejected(
        "NotAllowedError".to_string(),
    ))]);

    let result = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await;

    assert_eq!(
        result,
        Err(PlaybackError::PlaybackRejected("NotAllowedError".to_string()))
    );
    assert_eq!(loader.urls.len(), 1);
    assert!(loader.failed.is_empty());
    assert_eq!(f.catalog.calls("a"), 1);
    assert_eq!(
        f.telemetry
            .metrics()
            .failures_by_reason
            .get(&FailureReason::PlaybackRejected),
        Some(&1)
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_attempt() {
    let f = fixture();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let started = Instant::now();

    let result = f
        .resolver
        .resolve(&request(), &mut HangingLoader, &cancel)
        .await;

    assert_eq!(result, Err(PlaybackError::Cancelled));
    assert!(started.elapsed() < Duration::from_millis(1010));
    assert!(f.cache.get("a", AudioQuality::High).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_ready_paused_is_cached_unconfirmed() {
    let f = fixture();
    let mut loader = ScriptedLoader::new([Ok(AttemptOutcome::ReadyPaused)]);

    let resolved = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!resolved.confirmed);
    let entry = f.cache.get("a", AudioQuality::High).await.unwrap();
    assert_eq!(entry.url, resolved.url);
    assert!(!entry.confirmed);
}

#[tokio::test(start_paused = true)]
async fn test_catalog_failures_are_retried() {
    let f = fixture_with(ScriptedCatalog::new().refuse("a"), ScriptedHttp::new(), false);
    let mut loader = ScriptedLoader::default();

    let result = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await;

    match result {
        Err(PlaybackError::AttemptsExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last.failure_reason(), FailureReason::Catalog);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(loader.urls.is_empty());
    assert_eq!(f.catalog.calls("a"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_probe_failure_evicts_cached_candidate() {
    let http = ScriptedHttp::new().rule("cached.test", 410, "text/plain");
    let f = fixture_with(ScriptedCatalog::new(), http, true);
    f.cache
        .put("a", AudioQuality::High, &StreamUrl::new("https://cached.test/a"))
        .await;
    let mut loader = ScriptedLoader::default();

    let resolved = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolved.url, catalog_url("a", AudioQuality::High, 1));
    assert_eq!(resolved.attempts, 2);
    assert_eq!(loader.urls, vec![resolved.url.clone()]);
    assert_eq!(loader.failed, vec![(1, FailureReason::SourceGone)]);
    assert_eq!(f.cache.stats().evictions, 1);

    let probes = f.http.requests();
    assert_eq!(probes.len(), 2);
    assert!(probes
        .iter()
        .all(|(_, range)| range.as_deref() == Some("bytes=0-1")));
}

#[tokio::test(start_paused = true)]
async fn test_html_probe_response_is_unsupported() {
    let http = ScriptedHttp::new().rule("/a/HIGH/1", 200, "text/html; charset=utf-8");
    let f = fixture_with(ScriptedCatalog::new(), http, true);
    let mut loader = ScriptedLoader::default();

    let resolved = f
        .resolver
        .resolve(&request(), &mut loader, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolved.url, catalog_url("a", AudioQuality::High, 2));
    assert_eq!(loader.failed, vec![(1, FailureReason::UnsupportedSource)]);
}

#[tokio::test(start_paused = true)]
async fn test_warm_fetches_range_and_caches() {
    let f = fixture();

    assert!(f.resolver.warm("b", AudioQuality::High).await.unwrap());
    let url = catalog_url("b", AudioQuality::High, 1);
    assert_eq!(
        f.http.requests(),
        vec![(url.clone(), Some("bytes=0-262143".to_string()))]
    );
    let entry = f.cache.get("b", AudioQuality::High).await.unwrap();
    assert_eq!(entry.url, url);
    assert!(!entry.confirmed);

    // Already cached: no second catalog call.
    assert!(!f.resolver.warm("b", AudioQuality::High).await.unwrap());
    assert_eq!(f.catalog.calls("b"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_warm_rejects_gone_source() {
    let http = ScriptedHttp::new().rule("/b/", 404, "text/plain");
    let f = fixture_with(ScriptedCatalog::new(), http, false);

    let result = f.resolver.warm("b", AudioQuality::High).await;
    assert!(matches!(result, Err(PlaybackError::SourceGone(_))));
    assert!(f.cache.get("b", AudioQuality::High).await.is_none());
}
