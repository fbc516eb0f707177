//! In-memory key-value storage
//!
//! Used as the fallback backend when no durable store is available.
//! Entries live for the process lifetime only and the least recently used
//! keys are dropped once capacity is reached.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    storage::KeyValueStore,
    time::{Clock, SystemClock},
};
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// Default number of keys retained.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Bounded in-memory store with per-entry TTL
pub struct MemoryKeyValueStore {
    entries: Mutex<LruCache<String, MemoryEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for TTL checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn is_live(entry: &MemoryEntry, now: DateTime<Utc>) -> bool {
        entry.expires_at.map_or(true, |at| at > now)
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let (value, expired) = match entries.get(key) {
            Some(entry) if Self::is_live(entry, now) => (Some(entry.value.clone()), false),
            Some(_) => (None, true),
            None => (None, false),
        };
        if expired {
            entries.pop(key);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.and_then(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .map(|ttl| self.clock.now() + ttl)
        });

        self.entries.lock().put(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().pop(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
