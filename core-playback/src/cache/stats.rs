//! Cache statistics and monitoring

use serde::{Deserialize, Serialize};

/// Counters kept by the stream cache since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads that returned a servable entry
    pub hits: u64,

    /// Reads that found nothing servable
    pub misses: u64,

    /// Entries written (candidates and confirmations)
    pub writes: u64,

    /// Entries removed for expiry, failures or invalidation
    pub evictions: u64,

    /// Failures recorded against cached candidates
    pub failures_recorded: u64,

    /// Backend operations that failed and were degraded to a miss or no-op
    pub storage_errors: u64,
}

impl CacheStats {
    /// Fraction of reads that hit, zero before the first read.
    pub fn hit_rate(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            return 0.0;
        }

        self.hits as f64 / reads as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
