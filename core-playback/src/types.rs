//! # Playback Types
//!
//! Tracks, statuses and the state snapshot exposed to hosts.

use bridge_traits::AudioQuality;
use serde::{Deserialize, Serialize};

/// An immutable track identity as placed in a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog identifier.
    pub id: String,
    pub title: String,
    /// Nominal duration in seconds, replaced by the surface's figure once known.
    pub duration: f64,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: Option<String>,
    /// Qualities the catalog can serve for this track. Empty means "any".
    #[serde(default)]
    pub quality_capabilities: Vec<AudioQuality>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration: duration.max(0.0),
            artists: Vec::new(),
            album: None,
            quality_capabilities: Vec::new(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artists.push(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_qualities(mut self, qualities: impl IntoIterator<Item = AudioQuality>) -> Self {
        self.quality_capabilities = qualities.into_iter().collect();
        self
    }

    /// Quality to request for this track given the player's preference.
    ///
    /// Picks the requested quality when available, else the best quality
    /// below it, else the lowest the track offers.
    pub fn effective_quality(&self, requested: AudioQuality) -> AudioQuality {
        if self.quality_capabilities.is_empty() || self.quality_capabilities.contains(&requested) {
            return requested;
        }
        self.quality_capabilities
            .iter()
            .copied()
            .filter(|q| *q <= requested)
            .max()
            .or_else(|| self.quality_capabilities.iter().copied().min())
            .unwrap_or(requested)
    }
}

/// Repeat behaviour at the end of a track or queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

/// Projected playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Buffering,
    Playing,
    Paused,
    Error,
}

impl PlaybackStatus {
    /// `playing` or `buffering`.
    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackStatus::Playing | PlaybackStatus::Buffering)
    }

    /// `loading` or `buffering`.
    pub fn is_loading(self) -> bool {
        matches!(self, PlaybackStatus::Loading | PlaybackStatus::Buffering)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Buffering => "buffering",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player-facing playback state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub current_track: Option<Track>,
    /// Seconds, never negative.
    pub current_time: f64,
    /// Seconds; zero until known.
    pub duration: f64,
    /// In `[0, 1]`.
    pub volume: f32,
    pub quality: AudioQuality,
    /// Message of the failure that put the track in `error` or `paused`.
    pub last_error: Option<String>,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }
}

/// Playback state plus the queue fields, as returned by `get_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(flatten)]
    pub state: PlaybackState,
    pub queue: Vec<Track>,
    pub queue_index: Option<usize>,
    pub shuffle_enabled: bool,
    pub shuffle_order: Option<Vec<usize>>,
    pub shuffle_seed: u64,
    pub repeat_mode: RepeatMode,
}

impl PlayerSnapshot {
    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.state.current_track.as_ref().map(|t| t.id.as_str())
    }
}
