//! # Core Configuration Module
//!
//! Collects the host capabilities the player needs before it can start.
//!
//! ## Overview
//!
//! The configuration system uses a builder to construct a `CoreConfig`
//! holding every bridge implementation plus a few host-level settings. It
//! validates eagerly so a missing capability is reported at startup with an
//! actionable message instead of surfacing as a failed track later.
//!
//! ## Required Dependencies
//!
//! - `StreamUrlProvider` - The catalog that hands out stream URLs
//! - `RenderingSurface` - The host media element
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - Probes and preload range fetches (desktop default: reqwest)
//! - Durable `KeyValueStore` - Persistent stream cache (desktop default: SQLite at `cache_db_path`)
//! - Fallback `KeyValueStore` - Used when the durable store is unavailable (desktop default: in-memory)
//! - `NetworkMonitor` - Connection quality for preload decisions
//! - `Clock` - Time source for cache expiry and telemetry
//! - `EventBus` - Shared bus for host observers
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected automatically for the optional dependencies above.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .catalog(Arc::new(MyCatalog::new()))
//!     .surface(Arc::new(MyMediaElement::new()))
//!     .cache_db_path("/path/to/streams.db")
//!     .enable_preload(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing catalog and surface
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::EventBus;
use bridge_traits::{
    Clock, HttpClient, KeyValueStore, NetworkMonitor, RenderingSurface, StreamUrlProvider,
    SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Core configuration for the player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Catalog service resolving stream URLs (required)
    pub catalog: Arc<dyn StreamUrlProvider>,

    /// Media rendering surface (required)
    pub surface: Arc<dyn RenderingSurface>,

    /// HTTP client for probes and preload range fetches
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Preferred persistent store for the stream cache
    pub durable_store: Option<Arc<dyn KeyValueStore>>,

    /// Store used when the durable one is missing or unavailable
    pub fallback_store: Option<Arc<dyn KeyValueStore>>,

    /// Location of the desktop SQLite cache database
    pub cache_db_path: Option<PathBuf>,

    /// Network connectivity monitor
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Wall-clock time source
    pub clock: Arc<dyn Clock>,

    /// Event bus shared with host observers
    pub event_bus: EventBus,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("catalog", &"StreamUrlProvider { ... }")
            .field("surface", &"RenderingSurface { ... }")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field(
                "durable_store",
                &self.durable_store.as_ref().map(|s| s.backend_name()),
            )
            .field(
                "fallback_store",
                &self.fallback_store.as_ref().map(|s| s.backend_name()),
            )
            .field("cache_db_path", &self.cache_db_path)
            .field(
                "network_monitor",
                &self.network_monitor.as_ref().map(|_| "NetworkMonitor { ... }"),
            )
            .field("event_bus", &self.event_bus)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Probe candidate URLs with a tiny range request before loading them
    /// (requires HttpClient)
    pub enable_probe: bool,

    /// Warm the cache for the next track after playback is confirmed
    /// (requires HttpClient)
    pub enable_preload: bool,

    /// Skip preloading on constrained connections (requires NetworkMonitor)
    pub enable_network_awareness: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_probe: true,
            enable_preload: true,
            enable_network_awareness: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates feature flags against the capabilities that were provided.
    pub fn validate(&self) -> Result<()> {
        if self.features.enable_probe && self.http_client.is_none() {
            return Err(Error::Config(
                "Source probing enabled but no HttpClient provided. \
                 Disable the feature or inject an HttpClient implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_preload && self.http_client.is_none() {
            return Err(Error::Config(
                "Preloading enabled but no HttpClient provided. \
                 Disable the feature or inject an HttpClient implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_network_awareness && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network awareness enabled but no NetworkMonitor provided. \
                 Disable the feature or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        if self.durable_store.is_none()
            && self.fallback_store.is_none()
            && self.cache_db_path.is_none()
        {
            return Err(Error::capability_missing(
                "KeyValueStore",
                "The stream cache needs a durable or fallback KeyValueStore. \
                 Desktop: enable 'desktop-shims' or set cache_db_path. \
                 Web: inject an IndexedDB or localStorage-backed store.",
            ));
        }

        Ok(())
    }

    /// The durable store to try first, opening the desktop SQLite database
    /// when only a path was configured.
    ///
    /// Returns `None` when no durable store is configured or it cannot be
    /// opened; the caller falls back to [`CoreConfig::fallback_store`].
    pub async fn open_durable_store(&self) -> Option<Arc<dyn KeyValueStore>> {
        if let Some(store) = &self.durable_store {
            return Some(Arc::clone(store));
        }
        let path = self.cache_db_path.clone()?;
        open_default_durable_store(path, Arc::clone(&self.clock)).await
    }
}

#[cfg(feature = "desktop-shims")]
async fn open_default_durable_store(
    path: PathBuf,
    clock: Arc<dyn Clock>,
) -> Option<Arc<dyn KeyValueStore>> {
    use bridge_desktop::SqliteKeyValueStore;

    match SqliteKeyValueStore::open(path.clone()).await {
        Ok(store) => {
            debug!(path = ?path, "Opened SQLite stream cache");
            let store: Arc<dyn KeyValueStore> = Arc::new(store.with_clock(clock));
            Some(store)
        }
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "SQLite stream cache unavailable");
            None
        }
    }
}

#[cfg(not(feature = "desktop-shims"))]
async fn open_default_durable_store(
    path: PathBuf,
    _clock: Arc<dyn Clock>,
) -> Option<Arc<dyn KeyValueStore>> {
    debug!(
        path = ?path,
        "cache_db_path set but no desktop store is compiled in; durable cache disabled"
    );
    None
}

fn catalog_missing_error() -> Error {
    Error::capability_missing(
        "StreamUrlProvider",
        "A catalog implementation is required to resolve stream URLs. \
         Inject the host's catalog client with .catalog().",
    )
}

fn surface_missing_error() -> Error {
    Error::capability_missing(
        "RenderingSurface",
        "A rendering surface is required to play audio. \
         Inject the host's media element adapter with .surface().",
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Option<Arc<dyn HttpClient>> {
    let client: Arc<dyn HttpClient> = Arc::new(bridge_desktop::ReqwestHttpClient::new());
    Some(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Option<Arc<dyn HttpClient>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    let monitor: Arc<dyn NetworkMonitor> = Arc::new(bridge_desktop::DesktopNetworkMonitor::new());
    Some(monitor)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn provide_default_fallback_store(clock: &Arc<dyn Clock>) -> Option<Arc<dyn KeyValueStore>> {
    let store = bridge_desktop::MemoryKeyValueStore::new().with_clock(Arc::clone(clock));
    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    Some(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_fallback_store(_clock: &Arc<dyn Clock>) -> Option<Arc<dyn KeyValueStore>> {
    None
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    catalog: Option<Arc<dyn StreamUrlProvider>>,
    surface: Option<Arc<dyn RenderingSurface>>,
    http_client: Option<Arc<dyn HttpClient>>,
    durable_store: Option<Arc<dyn KeyValueStore>>,
    fallback_store: Option<Arc<dyn KeyValueStore>>,
    cache_db_path: Option<PathBuf>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    event_bus: Option<EventBus>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the catalog service (required).
    pub fn catalog(mut self, catalog: Arc<dyn StreamUrlProvider>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the rendering surface (required).
    pub fn surface(mut self, surface: Arc<dyn RenderingSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Sets the HTTP client.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the preferred persistent store.
    pub fn durable_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.durable_store = Some(store);
        self
    }

    /// Sets the fallback store.
    pub fn fallback_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.fallback_store = Some(store);
        self
    }

    /// Sets the desktop SQLite database location.
    pub fn cache_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_db_path = Some(path.into());
        self
    }

    /// Sets the network monitor.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the wall-clock source (defaults to [`SystemClock`]).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Shares an existing event bus instead of creating one.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Enables or disables source probing.
    pub fn enable_probe(mut self, enabled: bool) -> Self {
        self.features.enable_probe = enabled;
        self
    }

    /// Enables or disables preloading of the next track.
    pub fn enable_preload(mut self, enabled: bool) -> Self {
        self.features.enable_preload = enabled;
        self
    }

    /// Enables or disables network-aware preloading.
    pub fn enable_network_awareness(mut self, enabled: bool) -> Self {
        self.features.enable_network_awareness = enabled;
        self
    }

    /// Replaces all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when the catalog, the surface or every
    ///   cache store is missing
    /// - [`Error::Config`] when a feature flag needs a capability that was
    ///   not provided
    pub fn build(self) -> Result<CoreConfig> {
        let catalog = self.catalog.ok_or_else(catalog_missing_error)?;
        let surface = self.surface.ok_or_else(surface_missing_error)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let http_client = self.http_client.or_else(provide_default_http_client);
        let fallback_store = self
            .fallback_store
            .or_else(|| provide_default_fallback_store(&clock));

        let config = CoreConfig {
            catalog,
            surface,
            http_client,
            durable_store: self.durable_store,
            fallback_store,
            cache_db_path: self.cache_db_path,
            network_monitor: self
                .network_monitor
                .or_else(provide_default_network_monitor),
            clock,
            event_bus: self.event_bus.unwrap_or_default(),
            features: self.features,
        };

        config.validate()?;
        debug!(?config, "Built core configuration");

        Ok(config)
    }
}
