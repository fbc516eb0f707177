//! Rendering surface bridge.
//!
//! The rendering surface is the host's media element: it fetches and decodes
//! a URL, and reports what happens through a stream of [`SurfaceEvent`]s.
//! The core never decodes audio itself; it only issues commands here and
//! reacts to the events that come back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Media error codes reported by the surface, mirroring the classic
/// media-element error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaErrorCode {
    /// Fetch was aborted by the host.
    Aborted,
    /// Network failure while fetching media data.
    Network,
    /// Data was fetched but could not be decoded.
    Decode,
    /// The source format or codec is not supported.
    SourceNotSupported,
    /// Host-specific code with no dedicated variant.
    Other(u16),
}

impl MediaErrorCode {
    /// Map a numeric `MediaError.code` value onto the enum.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => MediaErrorCode::Aborted,
            2 => MediaErrorCode::Network,
            3 => MediaErrorCode::Decode,
            4 => MediaErrorCode::SourceNotSupported,
            other => MediaErrorCode::Other(other),
        }
    }
}

/// Events emitted by a rendering surface.
///
/// This is the complete vocabulary the playback state machine reacts to;
/// adapters translate whatever their platform emits into these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// Enough data is buffered to begin playback.
    CanPlay,
    /// Playback has started or resumed.
    Playing,
    /// Playback is waiting for more data.
    Waiting,
    /// The surface paused (host-initiated or in response to `pause()`).
    Paused,
    /// The end of the media was reached.
    Ended,
    /// Loading or playback failed.
    Error(MediaErrorCode),
    /// Playback position changed (seconds).
    TimeUpdate(f64),
    /// Media duration became known or changed (seconds).
    DurationChange(f64),
}

impl SurfaceEvent {
    /// Short event name used in logs and telemetry.
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceEvent::CanPlay => "canplay",
            SurfaceEvent::Playing => "playing",
            SurfaceEvent::Waiting => "waiting",
            SurfaceEvent::Paused => "pause",
            SurfaceEvent::Ended => "ended",
            SurfaceEvent::Error(_) => "error",
            SurfaceEvent::TimeUpdate(_) => "timeupdate",
            SurfaceEvent::DurationChange(_) => "durationchange",
        }
    }
}

/// Stream of surface events.
///
/// `next` must be cancel-safe: the engine polls it inside `select!` and may
/// drop the future before it completes.
#[async_trait]
pub trait SurfaceEventStream: Send {
    /// Next event, or `None` once the surface has been torn down.
    async fn next(&mut self) -> Option<SurfaceEvent>;
}

/// Platform media-rendering capability.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playback::RenderingSurface;
///
/// async fn start(surface: &dyn RenderingSurface, url: &str) -> Result<()> {
///     surface.load(url).await?;
///     surface.play().await
/// }
/// ```
#[async_trait]
pub trait RenderingSurface: Send + Sync {
    /// Replace the current source with `url` and begin fetching it.
    async fn load(&self, url: &str) -> Result<()>;

    /// Start or resume playback.
    ///
    /// Returns [`BridgeError::Rejected`](crate::error::BridgeError::Rejected)
    /// when the platform blocks playback (autoplay policy, missing gesture).
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the current source.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position in seconds.
    async fn seek(&self, position: f64) -> Result<()>;

    /// Set output volume in `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Subscribe to the surface's events.
    async fn subscribe_events(&self) -> Result<Box<dyn SurfaceEventStream>>;
}
