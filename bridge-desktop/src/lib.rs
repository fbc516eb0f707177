//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `KeyValueStore` backed by SQLite (durable) or an in-memory LRU (fallback)
//! - `HttpClient` using `reqwest`
//! - `NetworkMonitor` using a cached reachability probe
//!
//! The rendering surface and the catalog are host-specific and are not
//! provided here.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopNetworkMonitor, ReqwestHttpClient, SqliteKeyValueStore};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new();
//!     let store = SqliteKeyValueStore::open("/tmp/player/streams.db".into()).await?;
//!     let monitor = DesktopNetworkMonitor::new();
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```
//!
//! With the `desktop-shims` feature, `core-runtime` installs these as
//! defaults and picks the cache backend itself.

mod http;
mod memory_store;
mod network;
mod sqlite_store;

pub use http::ReqwestHttpClient;
pub use memory_store::{MemoryKeyValueStore, DEFAULT_CAPACITY};
pub use network::DesktopNetworkMonitor;
pub use sqlite_store::SqliteKeyValueStore;
