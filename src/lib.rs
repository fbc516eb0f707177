//! Stream player workspace facade.
//!
//! Re-exports the workspace crates under one name so a host application can
//! depend on `stream-player` alone:
//!
//! - [`playback`]: the engine, stream cache, resolver and telemetry
//! - [`runtime`]: configuration, logging and the event bus
//! - [`bridge`]: the capability traits a host implements
//! - [`desktop`]: ready-made desktop bridges (feature `desktop-shims`)
//!
//! ```ignore
//! use stream_player::playback::{PlaybackConfig, PlayerEngine};
//! use stream_player::runtime::config::CoreConfig;
//!
//! let core = CoreConfig::builder()
//!     .catalog(catalog)
//!     .surface(surface)
//!     .build()?;
//! let player = PlayerEngine::start(core, PlaybackConfig::default()).await?;
//! player.play_queue(tracks, 0).await?;
//! ```

pub use bridge_traits as bridge;
pub use core_playback as playback;
pub use core_runtime as runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop as desktop;

pub use core_playback::{
    PlaybackConfig, PlaybackError, PlaybackStatus, PlayerEngine, PlayerHandle, PlayerSnapshot,
    Track,
};
