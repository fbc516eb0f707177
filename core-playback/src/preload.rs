//! # Preloader
//!
//! Warms the stream cache for the track most likely to play next, once the
//! current one is confirmed. Preloading is best-effort: it never touches the
//! rendering surface and its failures are only logged.

use bridge_traits::{AudioQuality, NetworkMonitor};
use core_async::sync::CancellationToken;
use core_async::task::JoinHandle;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::resolver::StreamResolver;
use crate::telemetry::{Telemetry, TelemetryEvent, TelemetryKind};

/// What a preload request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadOutcome {
    Warmed,
    AlreadyCached,
    /// The network monitor reports a constrained connection.
    SkippedConstrained,
    /// Recent resolutions fail too often to spend bandwidth speculatively.
    SkippedErrorRate,
    Failed,
    Cancelled,
}

pub struct Preloader {
    resolver: Arc<StreamResolver>,
    telemetry: Arc<Telemetry>,
    network: Option<Arc<dyn NetworkMonitor>>,
    max_error_rate: f64,
    events: EventBus,
    current: Mutex<Option<CancellationToken>>,
}

impl Preloader {
    pub fn new(
        resolver: Arc<StreamResolver>,
        telemetry: Arc<Telemetry>,
        max_error_rate: f64,
        events: EventBus,
    ) -> Self {
        Self {
            resolver,
            telemetry,
            network: None,
            max_error_rate,
            events,
            current: Mutex::new(None),
        }
    }

    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network = Some(monitor);
        self
    }

    /// Starts warming `track_id` in the background, abandoning any earlier
    /// preload still in flight.
    pub fn hint(self: &Arc<Self>, track_id: &str, quality: AudioQuality) -> JoinHandle<PreloadOutcome> {
        let token = CancellationToken::new();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            previous.cancel();
        }

        let this = Arc::clone(self);
        let track_id = track_id.to_string();
        core_async::spawn(async move {
            core_async::select! {
                biased;
                _ = token.cancelled() => PreloadOutcome::Cancelled,
                outcome = this.preload(&track_id, quality) => outcome,
            }
        })
    }

    /// Cancels the in-flight preload, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
    }

    /// Warms `track_id` now, applying the skip heuristics.
    pub async fn preload(&self, track_id: &str, quality: AudioQuality) -> PreloadOutcome {
        if let Some(network) = &self.network {
            if network.is_constrained().await {
                self.record(track_id, "preload_skipped", "constrained network");
                return PreloadOutcome::SkippedConstrained;
            }
        }

        let error_rate = self.telemetry.error_rate();
        if error_rate > self.max_error_rate {
            self.record(
                track_id,
                "preload_skipped",
                format!("error rate {:.2}", error_rate),
            );
            return PreloadOutcome::SkippedErrorRate;
        }

        match self.resolver.warm(track_id, quality).await {
            Ok(true) => {
                debug!(track_id, quality = %quality, "Preloaded next track");
                self.record(track_id, "preload_warmed", quality.as_str());
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::Preloaded {
                        track_id: track_id.to_string(),
                    }))
                    .ok();
                PreloadOutcome::Warmed
            }
            Ok(false) => PreloadOutcome::AlreadyCached,
            Err(e) => {
                warn!(track_id, error = %e, "Preload failed");
                self.record(track_id, "preload_failed", e.to_string());
                PreloadOutcome::Failed
            }
        }
    }

    fn record(&self, track_id: &str, name: &str, detail: impl Into<String>) {
        self.telemetry.record(
            TelemetryEvent::new(TelemetryKind::Preload, name)
                .track(track_id)
                .detail(detail),
        );
    }
}

impl std::fmt::Debug for Preloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preloader")
            .field("network_aware", &self.network.is_some())
            .field("max_error_rate", &self.max_error_rate)
            .finish()
    }
}
