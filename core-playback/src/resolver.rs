//! # Stream Resolver
//!
//! Turns `(track, quality)` into a URL the rendering surface has proven it
//! can play.
//!
//! ## Attempt loop
//!
//! 1. Attempt 1 tries the cached candidate, when one exists and the caller
//!    did not ask to skip the cache.
//! 2. Otherwise (and on every later attempt) a fresh URL is requested from
//!    the catalog.
//! 3. With an [`HttpClient`] attached and probing enabled, the candidate is
//!    checked with a two-byte range request first.
//! 4. The [`AttemptLoader`] hands the URL to the rendering surface and waits
//!    for sustained playback, a failure, or a timeout.
//! 5. Success confirms the URL in the cache. Failure of a cached candidate is
//!    recorded against its entry; then the resolver backs off and tries again.
//!
//! Rejected playback and cancellation end the loop immediately. Everything
//! else is retried until `max_attempts` is spent.

use async_trait::async_trait;
use bridge_traits::{
    AudioQuality, BridgeError, HttpClient, HttpMethod, HttpRequest, HttpResponse, StreamUrl,
    StreamUrlProvider,
};
use chrono::{DateTime, Utc};
use core_async::sync::CancellationToken;
use core_async::time::{sleep, timeout};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cache::StreamCache;
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::telemetry::{Telemetry, TelemetryEvent, TelemetryKind};

/// How a successful attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Time advanced after `playing`: the URL is proven.
    Sustained,
    /// The surface is ready but the user wants to stay paused. The URL is
    /// kept as a candidate, not confirmed.
    ReadyPaused,
}

/// Drives a single candidate URL on the rendering surface.
#[async_trait]
pub trait AttemptLoader: Send {
    /// Loads `url` and waits for sustained playback, or for readiness while
    /// the user wants to stay paused.
    async fn attempt(&mut self, attempt: u32, url: &str) -> Result<AttemptOutcome>;

    /// Called after attempt `attempt` failed, before the backoff delay.
    fn attempt_failed(&mut self, _attempt: u32, _error: &PlaybackError) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub track_id: String,
    pub quality: AudioQuality,
    /// Ignore any cached candidate and start from the catalog.
    pub skip_cache: bool,
}

impl ResolveRequest {
    pub fn new(track_id: impl Into<String>, quality: AudioQuality) -> Self {
        Self {
            track_id: track_id.into(),
            quality,
            skip_cache: false,
        }
    }

    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub url: String,
    /// Expiry advertised by the catalog, or the cached entry's expiry.
    pub expiry_hint: Option<DateTime<Utc>>,
    /// 1-based attempt that succeeded.
    pub attempts: u32,
    pub from_cache: bool,
    /// Whether sustained playback was observed and the URL confirmed.
    pub confirmed: bool,
}

impl ResolvedStream {
    /// The resolved URL in the form the cache stores.
    pub fn stream_url(&self) -> StreamUrl {
        StreamUrl {
            url: self.url.clone(),
            expiry_hint: self.expiry_hint,
        }
    }
}

/// Resolves and validates stream URLs.
pub struct StreamResolver {
    catalog: Arc<dyn StreamUrlProvider>,
    cache: Arc<StreamCache>,
    http: Option<Arc<dyn HttpClient>>,
    probe: bool,
    telemetry: Arc<Telemetry>,
    config: Arc<PlaybackConfig>,
}

impl StreamResolver {
    pub fn new(
        catalog: Arc<dyn StreamUrlProvider>,
        cache: Arc<StreamCache>,
        telemetry: Arc<Telemetry>,
        config: Arc<PlaybackConfig>,
    ) -> Self {
        Self {
            catalog,
            cache,
            http: None,
            probe: false,
            telemetry,
            config,
        }
    }

    /// Attaches the HTTP client used for probes and preload fetches.
    pub fn with_http(mut self, http: Arc<dyn HttpClient>, probe: bool) -> Self {
        self.http = Some(http);
        self.probe = probe;
        self
    }

    pub fn cache(&self) -> &Arc<StreamCache> {
        &self.cache
    }

    /// Runs the attempt loop until a URL is confirmed, the budget is spent,
    /// or `cancel` fires.
    #[instrument(
        skip(self, loader, cancel),
        fields(track_id = %request.track_id, quality = %request.quality)
    )]
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
        loader: &mut dyn AttemptLoader,
        cancel: &CancellationToken,
    ) -> Result<ResolvedStream> {
        core_async::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Resolution cancelled");
                Err(PlaybackError::Cancelled)
            }
            result = self.run(request, loader) => result,
        }
    }

    async fn run(
        &self,
        request: &ResolveRequest,
        loader: &mut dyn AttemptLoader,
    ) -> Result<ResolvedStream> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.config.backoff_delay(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off");
                sleep(delay).await;
            }

            match self.try_attempt(request, attempt, loader).await {
                Ok(resolved) => return Ok(resolved),
                Err(e @ (PlaybackError::PlaybackRejected(_) | PlaybackError::Cancelled)) => {
                    return Err(e)
                }
                Err(e) => {
                    loader.attempt_failed(attempt, &e);
                    last_error = Some(e);
                }
            }
        }

        let last = last_error
            .unwrap_or_else(|| PlaybackError::Network("no attempt was made".to_string()));
        warn!(attempts = max_attempts, error = %last, "Stream resolution exhausted");
        Err(PlaybackError::AttemptsExhausted {
            attempts: max_attempts,
            last: Box::new(last),
        })
    }

    async fn try_attempt(
        &self,
        request: &ResolveRequest,
        attempt: u32,
        loader: &mut dyn AttemptLoader,
    ) -> Result<ResolvedStream> {
        self.telemetry.record(
            TelemetryEvent::new(TelemetryKind::ResolveAttempt, "resolve_attempt")
                .track(&request.track_id)
                .attempt(attempt),
        );

        let mut from_cache = false;
        let outcome = self
            .load_candidate(request, attempt, loader, &mut from_cache)
            .await;

        match outcome {
            Ok((stream, outcome)) => {
                let confirmed = outcome == AttemptOutcome::Sustained;
                if confirmed {
                    self.cache
                        .confirm(&request.track_id, request.quality, &stream)
                        .await;
                } else if !from_cache {
                    self.cache
                        .put(&request.track_id, request.quality, &stream)
                        .await;
                }
                self.telemetry.record(
                    TelemetryEvent::new(TelemetryKind::ResolveSuccess, "resolve_success")
                        .track(&request.track_id)
                        .attempt(attempt)
                        .detail(redact_url(&stream.url)),
                );
                info!(
                    attempt,
                    from_cache,
                    confirmed,
                    url = %redact_url(&stream.url),
                    "Stream ready"
                );
                Ok(ResolvedStream {
                    url: stream.url,
                    expiry_hint: stream.expiry_hint,
                    attempts: attempt,
                    from_cache,
                    confirmed,
                })
            }
            Err(e) => {
                let attributable =
                    !matches!(e, PlaybackError::Cancelled | PlaybackError::PlaybackRejected(_));
                if from_cache && attributable {
                    self.cache
                        .record_failure(&request.track_id, request.quality, &e)
                        .await;
                }
                self.telemetry.record(
                    TelemetryEvent::new(TelemetryKind::ResolveFailure, "resolve_failure")
                        .track(&request.track_id)
                        .attempt(attempt)
                        .reason(e.failure_reason())
                        .detail(e.to_string()),
                );
                warn!(attempt, from_cache, error = %e, "Resolution attempt failed");
                Err(e)
            }
        }
    }

    async fn load_candidate(
        &self,
        request: &ResolveRequest,
        attempt: u32,
        loader: &mut dyn AttemptLoader,
        from_cache: &mut bool,
    ) -> Result<(StreamUrl, AttemptOutcome)> {
        let cached = if attempt == 1 && !request.skip_cache {
            self.cache.get(&request.track_id, request.quality).await
        } else {
            None
        };

        let stream = match cached {
            Some(entry) => {
                *from_cache = true;
                debug!(confirmed = entry.confirmed, "Trying cached stream URL");
                StreamUrl::new(entry.url).with_expiry_hint(entry.expires_at)
            }
            None => self.fetch(request).await?,
        };

        if self.probe {
            if let Some(http) = &self.http {
                self.probe(http.as_ref(), &stream.url).await?;
            }
        }

        let outcome = loader.attempt(attempt, &stream.url).await?;
        Ok((stream, outcome))
    }

    async fn fetch(&self, request: &ResolveRequest) -> Result<StreamUrl> {
        let stream = self
            .catalog
            .get_stream_url(&request.track_id, request.quality)
            .await
            .map_err(PlaybackError::from_catalog)?;
        debug!(url = %redact_url(&stream.url), "Catalog issued stream URL");
        Ok(stream)
    }

    /// Two-byte range request that tells a dead or mistyped source from a
    /// live one before the surface spends its load budget on it.
    async fn probe(&self, http: &dyn HttpClient, url: &str) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Get, url)
            .range(0, 1)
            .timeout(self.config.probe_timeout);
        let response = self.fetch_range(http, request).await?;
        classify_response(&response)
    }

    async fn fetch_range(&self, http: &dyn HttpClient, request: HttpRequest) -> Result<HttpResponse> {
        let budget = request.timeout.unwrap_or(self.config.probe_timeout);
        match timeout(budget, http.execute(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(transport_error(e)),
            Err(_) => Err(PlaybackError::Timeout(budget)),
        }
    }

    /// Prefetches a URL for `track_id` into the cache without touching the
    /// rendering surface.
    ///
    /// Returns `false` when an unexpired entry already exists. The warmed
    /// entry stays unconfirmed until a real playback succeeds with it.
    #[instrument(skip(self), fields(quality = %quality))]
    pub async fn warm(&self, track_id: &str, quality: AudioQuality) -> Result<bool> {
        if self.cache.get(track_id, quality).await.is_some() {
            debug!("Preload skipped, candidate already cached");
            return Ok(false);
        }

        let stream = self
            .catalog
            .get_stream_url(track_id, quality)
            .await
            .map_err(PlaybackError::from_catalog)?;

        if let Some(http) = &self.http {
            let end = self.config.preload_range_bytes.max(1) - 1;
            let request = HttpRequest::new(HttpMethod::Get, &stream.url)
                .range(0, end)
                .timeout(self.config.probe_timeout);
            let response = self.fetch_range(http.as_ref(), request).await?;
            classify_response(&response)?;
            debug!(bytes = response.body.len(), "Preload range fetched");
        }

        self.cache.put(track_id, quality, &stream).await;
        Ok(true)
    }
}

impl std::fmt::Debug for StreamResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResolver")
            .field("cache", &self.cache)
            .field("http", &self.http.is_some())
            .field("probe", &self.probe)
            .field("max_attempts", &self.config.max_attempts)
            .finish()
    }
}

/// Classifies a probe or range response.
///
/// 403, 404 and 410 mean the source is gone for good. An HTML body on a
/// media URL is a captive portal or error page, not audio.
pub fn classify_response(response: &HttpResponse) -> Result<()> {
    match response.status {
        200 | 206 => match response.content_type() {
            Some(content_type) if content_type == "text/html" => Err(
                PlaybackError::UnsupportedSource(format!("unexpected content type {}", content_type)),
            ),
            _ => Ok(()),
        },
        status @ (403 | 404 | 410) => Err(PlaybackError::SourceGone(format!("HTTP {}", status))),
        status => Err(PlaybackError::Network(format!("HTTP {}", status))),
    }
}

fn transport_error(error: BridgeError) -> PlaybackError {
    match error {
        BridgeError::Network(msg) => PlaybackError::Network(msg),
        other => PlaybackError::Network(other.to_string()),
    }
}
