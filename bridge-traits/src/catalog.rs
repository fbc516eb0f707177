//! Catalog / Stream URL Resolution
//!
//! The catalog service is the upstream collaborator that turns a track
//! identifier and a requested quality into a short-lived, signed stream URL.
//! Each call is expected to return a *fresh* URL: the engine relies on this
//! to route around a failing CDN edge or an expired token by asking again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Audio quality tiers a catalog can serve.
///
/// Ordered from cheapest to richest so `max()` picks the best tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioQuality {
    Low,
    High,
    Lossless,
    HiResLossless,
}

impl AudioQuality {
    /// Wire name used in cache keys and catalog requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioQuality::Low => "LOW",
            AudioQuality::High => "HIGH",
            AudioQuality::Lossless => "LOSSLESS",
            AudioQuality::HiResLossless => "HI_RES_LOSSLESS",
        }
    }
}

impl Default for AudioQuality {
    fn default() -> Self {
        AudioQuality::High
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioQuality {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(AudioQuality::Low),
            "HIGH" => Ok(AudioQuality::High),
            "LOSSLESS" => Ok(AudioQuality::Lossless),
            "HI_RES_LOSSLESS" | "HI_RES" => Ok(AudioQuality::HiResLossless),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown audio quality: {}",
                other
            ))),
        }
    }
}

/// A stream URL handed out by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUrl {
    /// Playable URL (usually signed, pointing at a CDN edge).
    pub url: String,
    /// Expiry advertised by the catalog, when it reports one.
    pub expiry_hint: Option<DateTime<Utc>>,
}

impl StreamUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expiry_hint: None,
        }
    }

    pub fn with_expiry_hint(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expiry_hint = Some(expires_at);
        self
    }
}

/// Upstream catalog capable of resolving stream URLs.
///
/// # Errors
///
/// Implementations should map transport failures to
/// [`BridgeError::Network`], rejected credentials to
/// [`BridgeError::Unauthorized`] and unknown tracks to
/// [`BridgeError::NotFound`] so the engine can classify them.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::{AudioQuality, StreamUrlProvider};
///
/// async fn first_url(catalog: &dyn StreamUrlProvider) -> Result<String> {
///     let stream = catalog.get_stream_url("track-1", AudioQuality::Lossless).await?;
///     Ok(stream.url)
/// }
/// ```
#[async_trait]
pub trait StreamUrlProvider: Send + Sync {
    /// Request a fresh stream URL for `track_id` at `quality`.
    async fn get_stream_url(&self, track_id: &str, quality: AudioQuality) -> Result<StreamUrl>;
}
