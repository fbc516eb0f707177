//! # Host Bridge Traits
//!
//! Capability traits the playback core depends on but that each host must
//! provide.
//!
//! ## Overview
//!
//! The core never talks to a media element, a database, the network or the
//! catalog service directly. It receives implementations of the traits in this
//! crate and works only through them, which keeps the engine portable and lets
//! tests substitute scripted doubles.
//!
//! ## Traits
//!
//! ### Playback
//! - [`RenderingSurface`](playback::RenderingSurface) - Load, play, pause and seek a media URL
//! - [`SurfaceEventStream`](playback::SurfaceEventStream) - Events reported back by the surface
//!
//! ### Upstream
//! - [`StreamUrlProvider`](catalog::StreamUrlProvider) - Fresh, signed stream URLs per track and quality
//! - [`HttpClient`](http::HttpClient) - Async HTTP for probes and range fetches
//!
//! ### Persistence
//! - [`KeyValueStore`](storage::KeyValueStore) - String key-value storage with TTL
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity and connection quality
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Storage, HTTP, network |
//! | Web      | TBD                 | 📋 Planned |
//!
//! The rendering surface and the catalog are always injected by the host.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map platform failures onto the closest variant so the core can tell
//! transient network trouble from a source that is gone.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! between the engine task and its helpers.

pub mod catalog;
pub mod error;
pub mod http;
pub mod network;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{AudioQuality, StreamUrl, StreamUrlProvider};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use network::{
    EffectiveConnectionType, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType,
};
pub use playback::{MediaErrorCode, RenderingSurface, SurfaceEvent, SurfaceEventStream};
pub use storage::KeyValueStore;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
