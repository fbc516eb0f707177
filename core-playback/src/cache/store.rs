use bridge_traits::{AudioQuality, Clock, KeyValueStore, StreamUrl};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::entry::{cache_key, CacheEntry};
use super::stats::CacheStats;
use crate::error::PlaybackError;

/// Namespace for stream entries inside a shared key/value store.
pub const CACHE_KEY_PREFIX: &str = "stream:";

/// Persistent cache of stream URLs keyed by `(track, quality)`.
///
/// Reads return candidates; only [`StreamCache::confirm`] marks a URL as
/// proven. Every backend failure is logged and treated as a miss (reads) or
/// a no-op (writes).
pub struct StreamCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_failures: u32,
    stats: Mutex<CacheStats>,
    events: Option<EventBus>,
}

impl StreamCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        max_failures: u32,
    ) -> Self {
        Self {
            store,
            clock,
            ttl,
            max_failures: max_failures.max(1),
            stats: Mutex::new(CacheStats::default()),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Returns a servable entry, evicting it instead when it has expired or
    /// crossed the failure threshold.
    pub async fn get(&self, track_id: &str, quality: AudioQuality) -> Option<CacheEntry> {
        let key = cache_key(track_id, quality);
        let Some(entry) = self.read(&key).await else {
            self.stats.lock().misses += 1;
            return None;
        };

        if entry.is_expired(self.clock.now()) {
            self.evict(&key, "expired").await;
            self.stats.lock().misses += 1;
            return None;
        }

        if entry.failure_count >= self.max_failures {
            self.evict(&key, "failure_threshold").await;
            self.stats.lock().misses += 1;
            return None;
        }

        self.stats.lock().hits += 1;
        Some(entry)
    }

    /// Stores an unconfirmed candidate with the default TTL.
    pub async fn put(&self, track_id: &str, quality: AudioQuality, stream: &StreamUrl) {
        self.put_with_ttl(track_id, quality, stream, self.ttl).await;
    }

    /// Stores an unconfirmed candidate with an explicit TTL.
    pub async fn put_with_ttl(
        &self,
        track_id: &str,
        quality: AudioQuality,
        stream: &StreamUrl,
        ttl: Duration,
    ) {
        let entry = CacheEntry::new(&stream.url, self.clock.now(), ttl, stream.expiry_hint);
        self.write(&cache_key(track_id, quality), &entry).await;
    }

    /// Records sustained playback: the URL is stored as confirmed with its
    /// failure counter reset.
    pub async fn confirm(&self, track_id: &str, quality: AudioQuality, stream: &StreamUrl) {
        let key = cache_key(track_id, quality);
        let entry =
            CacheEntry::new(&stream.url, self.clock.now(), self.ttl, stream.expiry_hint).confirmed();
        if self.write(&key, &entry).await {
            debug!(key = %key, url = %redact_url(&stream.url), "Confirmed stream URL");
            self.emit(CacheEvent::Confirmed { key });
        }
    }

    /// Removes an entry unconditionally.
    pub async fn invalidate(&self, track_id: &str, quality: AudioQuality) {
        self.evict(&cache_key(track_id, quality), "invalidated").await;
    }

    /// Counts a failed attempt against the cached candidate.
    ///
    /// Returns true when the entry was evicted: immediately for fatal
    /// failures, otherwise once the counter reaches the threshold.
    pub async fn record_failure(
        &self,
        track_id: &str,
        quality: AudioQuality,
        error: &PlaybackError,
    ) -> bool {
        let key = cache_key(track_id, quality);
        self.stats.lock().failures_recorded += 1;

        if error.is_fatal_for_cache() {
            self.evict(&key, "fatal").await;
            return true;
        }

        let Some(mut entry) = self.read(&key).await else {
            return false;
        };
        entry.failure_count += 1;
        entry.confirmed = false;

        if entry.failure_count >= self.max_failures {
            self.evict(&key, "failure_threshold").await;
            return true;
        }

        debug!(key = %key, failures = entry.failure_count, "Recorded stream failure");
        self.write(&key, &entry).await;
        false
    }

    /// Deletes every expired or over-threshold entry. Returns how many went.
    pub async fn purge_expired(&self) -> usize {
        let keys = match self.store.keys(CACHE_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                self.storage_error("keys", CACHE_KEY_PREFIX, &e);
                return 0;
            }
        };

        let now = self.clock.now();
        let mut purged = 0;
        for storage_key in keys {
            let key = &storage_key[CACHE_KEY_PREFIX.len()..];
            let stale = match self.read(key).await {
                Some(entry) => entry.is_expired(now) || entry.failure_count >= self.max_failures,
                None => true,
            };
            if stale {
                self.evict(key, "expired").await;
                purged += 1;
            }
        }
        purged
    }

    /// Removes every stream entry.
    pub async fn clear(&self) -> usize {
        match self.store.clear_prefix(CACHE_KEY_PREFIX).await {
            Ok(removed) => removed,
            Err(e) => {
                self.storage_error("clear", CACHE_KEY_PREFIX, &e);
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    async fn read(&self, key: &str) -> Option<CacheEntry> {
        let storage_key = format!("{}{}", CACHE_KEY_PREFIX, key);
        let raw = match self.store.get(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                self.storage_error("get", key, &e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding corrupt stream cache entry");
                self.stats.lock().storage_errors += 1;
                if let Err(e) = self.store.delete(&storage_key).await {
                    self.storage_error("delete", key, &e);
                }
                None
            }
        }
    }

    async fn write(&self, key: &str, entry: &CacheEntry) -> bool {
        let value = match serde_json::to_string(entry) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode stream cache entry");
                return false;
            }
        };
        let ttl = entry.remaining_ttl(self.clock.now());
        let storage_key = format!("{}{}", CACHE_KEY_PREFIX, key);

        match self.store.set(&storage_key, &value, Some(ttl)).await {
            Ok(()) => {
                self.stats.lock().writes += 1;
                true
            }
            Err(e) => {
                self.storage_error("set", key, &e);
                false
            }
        }
    }

    async fn evict(&self, key: &str, reason: &str) {
        let storage_key = format!("{}{}", CACHE_KEY_PREFIX, key);
        if let Err(e) = self.store.delete(&storage_key).await {
            self.storage_error("delete", key, &e);
            return;
        }
        self.stats.lock().evictions += 1;
        debug!(key = %key, reason, "Evicted stream cache entry");
        self.emit(CacheEvent::Evicted {
            key: key.to_string(),
            reason: reason.to_string(),
        });
    }

    fn storage_error(&self, operation: &str, key: &str, error: &bridge_traits::BridgeError) {
        self.stats.lock().storage_errors += 1;
        warn!(
            operation,
            key = %key,
            backend = self.store.backend_name(),
            error = %error,
            "Stream cache storage failure, treating as miss"
        );
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Cache(event)).ok();
        }
    }
}

impl std::fmt::Debug for StreamCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCache")
            .field("backend", &self.store.backend_name())
            .field("ttl", &self.ttl)
            .field("max_failures", &self.max_failures)
            .finish()
    }
}
