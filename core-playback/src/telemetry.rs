//! # Telemetry Collector
//!
//! Bounded, append-only log of playback events with derived counters.
//!
//! The resolver records every attempt, success and failure; the engine
//! records commands, surface events and status transitions. Diagnostic views
//! read the log through [`Telemetry::recent`] and [`Telemetry::metrics`].
//! Nothing in the engine reads telemetry back except the preloader, which
//! consults the error rate.

use bridge_traits::Clock;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Category of a telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    /// A control command was received.
    Command,
    /// The rendering surface emitted an event.
    SurfaceEvent,
    /// The projected status changed.
    StateTransition,
    ResolveAttempt,
    ResolveSuccess,
    ResolveFailure,
    /// Preloader activity (warmed or skipped).
    Preload,
}

/// Why a resolution attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Network,
    UnsupportedSource,
    Timeout,
    Stall,
    PlaybackRejected,
    SourceGone,
    Catalog,
    Storage,
    Cancelled,
    Other,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::Network => "network",
            FailureReason::UnsupportedSource => "unsupported_source",
            FailureReason::Timeout => "timeout",
            FailureReason::Stall => "stall",
            FailureReason::PlaybackRejected => "playback_rejected",
            FailureReason::SourceGone => "source_gone",
            FailureReason::Catalog => "catalog",
            FailureReason::Storage => "storage",
            FailureReason::Cancelled => "cancelled",
            FailureReason::Other => "other",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Filled in by the collector when recorded.
    pub timestamp: DateTime<Utc>,
    pub kind: TelemetryKind,
    pub name: String,
    pub track_id: Option<String>,
    pub current_time: Option<f64>,
    pub duration: Option<f64>,
    pub paused: Option<bool>,
    /// Free-form detail. URLs are redacted before they get here.
    pub detail: Option<String>,
    pub attempt: Option<u32>,
    pub reason: Option<FailureReason>,
}

impl TelemetryEvent {
    pub fn new(kind: TelemetryKind, name: impl Into<String>) -> Self {
        Self {
            timestamp: DateTime::<Utc>::default(),
            kind,
            name: name.into(),
            track_id: None,
            current_time: None,
            duration: None,
            paused: None,
            detail: None,
            attempt: None,
            reason: None,
        }
    }

    pub fn track(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Some(track_id.into());
        self
    }

    pub fn position(mut self, current_time: f64, duration: f64, paused: bool) -> Self {
        self.current_time = Some(current_time);
        self.duration = Some(duration);
        self.paused = Some(paused);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn reason(mut self, reason: FailureReason) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Counters derived from recorded events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMetrics {
    pub resolve_attempts: u64,
    pub resolve_successes: u64,
    pub resolve_failures: u64,
    pub failures_by_reason: BTreeMap<FailureReason, u64>,
    /// `resolve_failures / resolve_attempts`, zero before the first attempt.
    pub error_rate: f64,
    /// Events recorded since the last clear.
    pub recorded: u64,
    /// Events pushed out of the ring by newer ones.
    pub dropped: u64,
    /// Events currently held.
    pub buffered: usize,
}

#[derive(Default)]
struct TelemetryInner {
    events: VecDeque<TelemetryEvent>,
    attempts: u64,
    successes: u64,
    failures: BTreeMap<FailureReason, u64>,
    recorded: u64,
    dropped: u64,
}

/// Bounded telemetry log shared by the resolver, engine and preloader.
pub struct Telemetry {
    capacity: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<TelemetryInner>,
}

impl Telemetry {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity: capacity.max(1),
            clock,
            inner: Mutex::new(TelemetryInner::default()),
        }
    }

    /// Appends an event, evicting the oldest one when the ring is full.
    pub fn record(&self, mut event: TelemetryEvent) {
        event.timestamp = self.clock.now();

        debug!(
            target: "core_playback::telemetry",
            kind = ?event.kind,
            name = %event.name,
            track_id = event.track_id.as_deref().unwrap_or(""),
            attempt = event.attempt.unwrap_or(0),
            reason = event.reason.map(FailureReason::as_str).unwrap_or(""),
            detail = event.detail.as_deref().unwrap_or(""),
            "telemetry"
        );

        let mut inner = self.inner.lock();
        match event.kind {
            TelemetryKind::ResolveAttempt => inner.attempts += 1,
            TelemetryKind::ResolveSuccess => inner.successes += 1,
            TelemetryKind::ResolveFailure => {
                let reason = event.reason.unwrap_or(FailureReason::Other);
                *inner.failures.entry(reason).or_insert(0) += 1;
            }
            _ => {}
        }
        inner.recorded += 1;
        inner.events.push_back(event);
        while inner.events.len() > self.capacity {
            inner.events.pop_front();
            inner.dropped += 1;
        }
    }

    /// Drops every event and resets the counters.
    pub fn clear(&self) {
        *self.inner.lock() = TelemetryInner::default();
    }

    /// The `n` most recent events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<TelemetryEvent> {
        let inner = self.inner.lock();
        let skip = inner.events.len().saturating_sub(n);
        inner.events.iter().skip(skip).cloned().collect()
    }

    /// Every buffered event, oldest first.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.inner.lock().events.iter().cloned().collect()
    }

    pub fn metrics(&self) -> TelemetryMetrics {
        let inner = self.inner.lock();
        let failures: u64 = inner.failures.values().sum();
        let error_rate = if inner.attempts == 0 {
            0.0
        } else {
            failures as f64 / inner.attempts as f64
        };
        TelemetryMetrics {
            resolve_attempts: inner.attempts,
            resolve_successes: inner.successes,
            resolve_failures: failures,
            failures_by_reason: inner.failures.clone(),
            error_rate,
            recorded: inner.recorded,
            dropped: inner.dropped,
            buffered: inner.events.len(),
        }
    }

    /// Current resolve error rate.
    pub fn error_rate(&self) -> f64 {
        self.metrics().error_rate
    }

    /// Buffered events as a JSON array.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.events())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("capacity", &self.capacity)
            .field("buffered", &self.inner.lock().events.len())
            .finish()
    }
}
