//! # Playback Error Types
//!
//! Errors produced while resolving and playing streams.
//!
//! Most variants are attempt-local: the resolver retries them with a fresh
//! URL and only reports the track as failed once the attempt budget is spent.
//! [`PlaybackError::PlaybackRejected`] is the exception and is surfaced
//! immediately so the host can ask for a user gesture.

use bridge_traits::error::BridgeError;
use bridge_traits::MediaErrorCode;
use std::time::Duration;
use thiserror::Error;

use crate::telemetry::FailureReason;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Attempt Errors
    // ========================================================================
    /// DNS, connection or transport failure while fetching the stream.
    #[error("Network error: {0}")]
    Network(String),

    /// The rendering surface rejected the format or codec.
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// No readiness signal arrived within the load budget.
    #[error("No readiness signal within {0:?}")]
    Timeout(Duration),

    /// Playback started, then stopped making progress.
    #[error("Playback stalled for {0:?}")]
    Stall(Duration),

    /// The host refused to start playback (e.g. a user gesture is required).
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// The server confirmed the resource no longer exists.
    #[error("Source gone: {0}")]
    SourceGone(String),

    /// The catalog could not hand out a URL.
    #[error("Catalog error: {0}")]
    Catalog(String),

    // ========================================================================
    // Track-level Errors
    // ========================================================================
    /// Every attempt failed.
    #[error("Gave up after {attempts} attempts: {last}")]
    AttemptsExhausted {
        attempts: u32,
        last: Box<PlaybackError>,
    },

    /// The work was superseded by a newer command.
    #[error("Operation cancelled")]
    Cancelled,

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Persistent cache unavailable or an entry is corrupt.
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Control Errors
    // ========================================================================
    /// A command needs a current track but the queue is empty.
    #[error("Queue is empty")]
    EmptyQueue,

    /// Queue index out of range.
    #[error("Invalid queue index {index} for queue of length {len}")]
    InvalidIndex { index: usize, len: usize },

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The engine task is no longer running.
    #[error("Player engine is shut down")]
    EngineClosed,
}

impl PlaybackError {
    /// Whether a fresh attempt with a new URL may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlaybackError::Network(_)
                | PlaybackError::UnsupportedSource(_)
                | PlaybackError::Timeout(_)
                | PlaybackError::Stall(_)
                | PlaybackError::SourceGone(_)
                | PlaybackError::Catalog(_)
        )
    }

    /// Failures that evict a cached URL on the first occurrence.
    pub fn is_fatal_for_cache(&self) -> bool {
        matches!(
            self,
            PlaybackError::SourceGone(_) | PlaybackError::UnsupportedSource(_)
        )
    }

    /// Telemetry classification of this error.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            PlaybackError::Network(_) => FailureReason::Network,
            PlaybackError::UnsupportedSource(_) => FailureReason::UnsupportedSource,
            PlaybackError::Timeout(_) => FailureReason::Timeout,
            PlaybackError::Stall(_) => FailureReason::Stall,
            PlaybackError::PlaybackRejected(_) => FailureReason::PlaybackRejected,
            PlaybackError::SourceGone(_) => FailureReason::SourceGone,
            PlaybackError::Catalog(_) => FailureReason::Catalog,
            PlaybackError::Storage(_) => FailureReason::Storage,
            PlaybackError::Cancelled => FailureReason::Cancelled,
            PlaybackError::AttemptsExhausted { last, .. } => last.failure_reason(),
            PlaybackError::EmptyQueue
            | PlaybackError::InvalidIndex { .. }
            | PlaybackError::Config(_)
            | PlaybackError::EngineClosed => FailureReason::Other,
        }
    }

    /// Maps a media element error code onto the taxonomy.
    pub fn from_media_error(code: MediaErrorCode) -> Self {
        match code {
            MediaErrorCode::Decode => {
                PlaybackError::UnsupportedSource("media decode error".to_string())
            }
            MediaErrorCode::SourceNotSupported => {
                PlaybackError::UnsupportedSource("source not supported".to_string())
            }
            MediaErrorCode::Network => PlaybackError::Network("media network error".to_string()),
            MediaErrorCode::Aborted => PlaybackError::Network("media load aborted".to_string()),
            MediaErrorCode::Other(code) => {
                PlaybackError::Network(format!("media error code {}", code))
            }
        }
    }

    /// Maps a catalog failure. Transport problems stay network errors, the
    /// rest are reported as catalog errors.
    pub fn from_catalog(error: BridgeError) -> Self {
        match error {
            BridgeError::Network(msg) => PlaybackError::Network(msg),
            other => PlaybackError::Catalog(other.to_string()),
        }
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Network(msg) => PlaybackError::Network(msg),
            BridgeError::NotFound(msg) => PlaybackError::SourceGone(msg),
            BridgeError::Rejected(msg) => PlaybackError::PlaybackRejected(msg),
            BridgeError::Storage(msg) => PlaybackError::Storage(msg),
            BridgeError::Io(e) => PlaybackError::Storage(e.to_string()),
            BridgeError::Unauthorized(msg) => PlaybackError::Catalog(msg),
            BridgeError::NotAvailable(msg) => PlaybackError::Config(msg),
            BridgeError::OperationFailed(msg) => PlaybackError::Network(msg),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
