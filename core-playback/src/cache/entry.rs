use bridge_traits::AudioQuality;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Query parameters CDNs commonly use for an absolute expiry (unix time).
const EXPIRY_PARAMS: &[&str] = &["expires", "exp", "expiry", "e"];

/// A cached stream URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub obtained_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Failures recorded since the last confirmed playback.
    pub failure_count: u32,
    /// Set once the surface reached sustained playback with this URL.
    pub confirmed: bool,
}

impl CacheEntry {
    /// Builds an entry obtained at `now`.
    ///
    /// Expires at `now + ttl`, or later when the catalog or the URL itself
    /// advertises a later expiry.
    pub fn new(
        url: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
        expiry_hint: Option<DateTime<Utc>>,
    ) -> Self {
        let url = url.into();
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX);
        let default_expiry = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let hint = expiry_hint.or_else(|| url_expiry_hint(&url));
        let expires_at = match hint {
            Some(hint) if hint > default_expiry => hint,
            _ => default_expiry,
        };

        Self {
            url,
            obtained_at: now,
            expires_at,
            failure_count: 0,
            confirmed: false,
        }
    }

    pub fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero when already expired.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Logical cache key: `trackId:QUALITY`.
pub fn cache_key(track_id: &str, quality: AudioQuality) -> String {
    format!("{}:{}", track_id, quality.as_str())
}

/// Absolute expiry embedded in a signed URL's query string, if any.
///
/// Recognises `Expires`, `exp`, `expiry` and `e` holding unix seconds (or
/// milliseconds, for values too large to be seconds).
pub fn url_expiry_hint(url: &str) -> Option<DateTime<Utc>> {
    let parsed = Url::parse(url).ok()?;
    parsed.query_pairs().find_map(|(key, value)| {
        if !EXPIRY_PARAMS.iter().any(|p| key.eq_ignore_ascii_case(p)) {
            return None;
        }
        let raw: i64 = value.trim().parse().ok()?;
        if raw <= 0 {
            return None;
        }
        if raw > 100_000_000_000 {
            DateTime::from_timestamp_millis(raw)
        } else {
            DateTime::from_timestamp(raw, 0)
        }
    })
}
