//! # Stream Cache Module
//!
//! Remembers which stream URL last played for a `(track, quality)` pair so
//! the next play can skip the catalog round-trip.
//!
//! ## Overview
//!
//! - Entries expire at `max(now + ttl, url expiry hint)`
//! - A cached URL is only a *candidate*: the resolver confirms it after
//!   sustained playback and records a failure otherwise
//! - Repeated failures (or one fatal failure) evict the entry
//! - Storage problems degrade to cache misses and are never raised
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     StreamCache                        │
//! │  - get() / put() / confirm()           │
//! │  - record_failure() / invalidate()     │
//! │  - purge_expired() / stats()           │
//! └────────┬───────────────────────────────┘
//!          │
//!          └──> TieredStore (KeyValueStore)
//!                 ├──> durable store (SQLite / IndexedDB)
//!                 └──> fallback store (memory / localStorage)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::StreamCache;
//!
//! # async fn example(cache: &StreamCache) {
//! if let Some(entry) = cache.get("track-1", AudioQuality::Lossless).await {
//!     println!("candidate: {}", entry.url);
//! }
//! # }
//! ```

mod backend;
mod entry;
mod stats;
mod store;

pub use backend::TieredStore;
pub use entry::{cache_key, url_expiry_hint, CacheEntry};
pub use stats::CacheStats;
pub use store::{StreamCache, CACHE_KEY_PREFIX};
