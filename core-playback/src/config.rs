//! # Playback Configuration
//!
//! Tunables for resolution retries, readiness budgets, the stream cache,
//! telemetry and preloading.

use bridge_traits::AudioQuality;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

/// Playback engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Resolution attempts per track before it enters `error`.
    ///
    /// Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt.
    ///
    /// Default: 400 ms.
    #[serde(default = "default_backoff_base")]
    pub backoff_base: Duration,

    /// Growth factor applied to the delay after each failed attempt.
    ///
    /// Default: 2.0.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on any single backoff delay.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_backoff_max")]
    pub backoff_max: Duration,

    /// How long an attempt may wait for the surface to become ready.
    ///
    /// Default: 12 seconds.
    #[serde(default = "default_load_timeout")]
    pub load_timeout: Duration,

    /// How long playback may go without time progress before it counts as
    /// a stall.
    ///
    /// Default: 8 seconds.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout: Duration,

    /// Seconds of time progress after `playing` that confirm a URL.
    ///
    /// Default: 0.25.
    #[serde(default = "default_sustain_progress")]
    pub sustain_progress: f64,

    /// Lifetime of a cache entry without an expiry hint.
    ///
    /// Default: 6 hours.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: Duration,

    /// Failures after which a cached URL is evicted.
    ///
    /// Default: 3.
    #[serde(default = "default_max_cache_failures")]
    pub max_cache_failures: u32,

    /// Size of the telemetry ring buffer.
    ///
    /// Default: 500 events.
    #[serde(default = "default_telemetry_capacity")]
    pub telemetry_capacity: usize,

    /// Bytes fetched when warming the next track.
    ///
    /// Default: 256 KiB.
    #[serde(default = "default_preload_range_bytes")]
    pub preload_range_bytes: u64,

    /// Preloading pauses while the resolve error rate is above this.
    ///
    /// Default: 0.5.
    #[serde(default = "default_preload_max_error_rate")]
    pub preload_max_error_rate: f64,

    /// Timeout for the reachability probe.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: Duration,

    /// How often the engine checks confirmed playback for stalls.
    ///
    /// Default: 250 ms.
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval: Duration,

    /// Quality requested when the host has not chosen one.
    #[serde(default)]
    pub default_quality: AudioQuality,

    /// Volume applied to the surface at startup.
    ///
    /// Default: 1.0.
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base: default_backoff_base(),
            backoff_multiplier: default_backoff_multiplier(),
            backoff_max: default_backoff_max(),
            load_timeout: default_load_timeout(),
            stall_timeout: default_stall_timeout(),
            sustain_progress: default_sustain_progress(),
            cache_ttl: default_cache_ttl(),
            max_cache_failures: default_max_cache_failures(),
            telemetry_capacity: default_telemetry_capacity(),
            preload_range_bytes: default_preload_range_bytes(),
            preload_max_error_rate: default_preload_max_error_rate(),
            probe_timeout: default_probe_timeout(),
            watchdog_interval: default_watchdog_interval(),
            default_quality: AudioQuality::default(),
            initial_volume: default_initial_volume(),
        }
    }
}

impl PlaybackConfig {
    /// More attempts with short delays, for flaky edges where a fresh URL
    /// usually helps.
    pub fn aggressive_retry() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_secs(2),
            load_timeout: Duration::from_secs(8),
            stall_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Fewer attempts and longer budgets, for slow links where timeouts
    /// would otherwise fire on healthy streams.
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(8),
            load_timeout: Duration::from_secs(20),
            stall_timeout: Duration::from_secs(12),
            preload_max_error_rate: 0.25,
            ..Default::default()
        }
    }

    /// Delay inserted after failed attempt `attempt` (1-based):
    /// `min(base * multiplier^(attempt-1), max)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.backoff_base.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);
        if !nanos.is_finite() || nanos >= self.backoff_max.as_nanos() as f64 {
            return self.backoff_max;
        }
        Duration::from_nanos(nanos.max(0.0).round() as u64)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(config_error("max_attempts must be > 0"));
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(config_error("backoff_multiplier must be >= 1.0"));
        }

        if self.backoff_base > self.backoff_max {
            return Err(config_error("backoff_base cannot exceed backoff_max"));
        }

        if self.load_timeout.is_zero() || self.stall_timeout.is_zero() {
            return Err(config_error("load_timeout and stall_timeout must be > 0"));
        }

        if !self.sustain_progress.is_finite() || self.sustain_progress < 0.0 {
            return Err(config_error("sustain_progress must be a non-negative number"));
        }

        if self.max_cache_failures == 0 {
            return Err(config_error("max_cache_failures must be > 0"));
        }

        if self.telemetry_capacity == 0 {
            return Err(config_error("telemetry_capacity must be > 0"));
        }

        if self.preload_range_bytes == 0 {
            return Err(config_error("preload_range_bytes must be > 0"));
        }

        if !(0.0..=1.0).contains(&self.preload_max_error_rate) {
            return Err(config_error(
                "preload_max_error_rate must be between 0.0 and 1.0",
            ));
        }

        if self.watchdog_interval.is_zero() {
            return Err(config_error("watchdog_interval must be > 0"));
        }

        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(config_error("initial_volume must be between 0.0 and 1.0"));
        }

        Ok(())
    }
}

fn config_error(message: &str) -> PlaybackError {
    PlaybackError::Config(message.to_string())
}

// Default value functions
fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> Duration {
    Duration::from_millis(400)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_backoff_max() -> Duration {
    Duration::from_secs(5)
}

fn default_load_timeout() -> Duration {
    Duration::from_secs(12)
}

fn default_stall_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_sustain_progress() -> f64 {
    0.25
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(6 * 60 * 60)
}

fn default_max_cache_failures() -> u32 {
    3
}

fn default_telemetry_capacity() -> usize {
    500
}

fn default_preload_range_bytes() -> u64 {
    256 * 1024
}

fn default_preload_max_error_rate() -> f64 {
    0.5
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_watchdog_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_initial_volume() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.cache_ttl, Duration::from_secs(21_600));
        assert_eq!(config.default_quality, AudioQuality::High);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(PlaybackConfig::aggressive_retry().validate().is_ok());
        assert!(PlaybackConfig::conservative().validate().is_ok());
    }

    #[test]
    fn test_backoff_curve() {
        let config = PlaybackConfig::default();
        assert_eq!(config.backoff_delay(1), Duration::from_millis(400));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(800));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(1600));
        assert_eq!(config.backoff_delay(5), Duration::from_secs(5));
        assert_eq!(config.backoff_delay(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_validation() {
        let mut config = PlaybackConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = PlaybackConfig::default();
        config.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = PlaybackConfig::default();
        config.preload_max_error_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = PlaybackConfig::default();
        config.initial_volume = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let config: PlaybackConfig = serde_json::from_str(r#"{"max_attempts": 4}"#).unwrap();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.backoff_base, Duration::from_millis(400));
        assert_eq!(config.telemetry_capacity, 500);
    }
}
