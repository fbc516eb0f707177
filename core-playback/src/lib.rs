//! # Playback Reliability Engine
//!
//! Gets a track playing from a short-lived, signed stream URL and keeps it
//! playing when the URL, the CDN edge or the network misbehaves.
//!
//! ## Overview
//!
//! This crate handles:
//! - A persistent stream-URL cache with TTL and failure-based eviction
//! - Resolution with retry, exponential backoff and optional source probing
//! - A reducer-style playback state machine driven by commands and
//!   rendering-surface events
//! - Queue navigation with seeded shuffle and repeat modes
//! - Bounded telemetry of every command, attempt and transition
//! - Best-effort preloading of the next track
//!
//! The crate never decodes audio. The host's rendering surface does, and the
//! engine only decides which URL it gets and reacts to what it reports.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{PlaybackConfig, PlayerEngine, Track};
//! use core_runtime::config::CoreConfig;
//!
//! let core = CoreConfig::builder()
//!     .catalog(catalog)
//!     .surface(surface)
//!     .build()?;
//! let player = PlayerEngine::start(core, PlaybackConfig::default()).await?;
//!
//! player
//!     .play_queue(vec![Track::new("t1", "Intro", 212.0)], 0)
//!     .await?;
//! let state = player.get_state();
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod preload;
pub mod queue;
pub mod resolver;
pub mod state;
pub mod telemetry;
pub mod types;

pub use cache::{CacheEntry, CacheStats, StreamCache, TieredStore};
pub use config::PlaybackConfig;
pub use engine::{PlayerEngine, PlayerHandle};
pub use error::{PlaybackError, Result};
pub use preload::{PreloadOutcome, Preloader};
pub use queue::QueueState;
pub use resolver::{
    AttemptLoader, AttemptOutcome, ResolveRequest, ResolvedStream, StreamResolver,
};
pub use state::{project_status, reduce, Action, Effect, EngineState, Intent, RetryPhase};
pub use telemetry::{FailureReason, Telemetry, TelemetryEvent, TelemetryKind, TelemetryMetrics};
pub use types::{PlaybackState, PlaybackStatus, PlayerSnapshot, RepeatMode, Track};

// Bridge types that appear in this crate's public API.
pub use bridge_traits::{AudioQuality, StreamUrl};
