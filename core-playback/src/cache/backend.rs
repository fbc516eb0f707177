use async_trait::async_trait;
use bridge_traits::{error::Result as BridgeResult, BridgeError, KeyValueStore};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Ordered-preference pair of key/value stores.
///
/// The durable store is used when present and available at startup. If it
/// fails at runtime, every later operation goes to the fallback. Callers only
/// see the [`KeyValueStore`] interface.
pub struct TieredStore {
    primary: Option<Arc<dyn KeyValueStore>>,
    fallback: Option<Arc<dyn KeyValueStore>>,
    degraded: AtomicBool,
    events: Option<EventBus>,
}

impl TieredStore {
    /// Picks the backend order once, probing the durable store.
    pub async fn select(
        primary: Option<Arc<dyn KeyValueStore>>,
        fallback: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let primary = match primary {
            Some(store) if store.is_available().await => Some(store),
            Some(store) => {
                warn!(
                    backend = store.backend_name(),
                    "Durable stream cache unavailable, using fallback"
                );
                None
            }
            None => None,
        };

        let store = Self {
            primary,
            fallback,
            degraded: AtomicBool::new(false),
            events: None,
        };
        info!(backend = store.backend_name(), "Stream cache backend selected");
        store
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Whether the durable store has been abandoned after a failure.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn active(&self) -> BridgeResult<&Arc<dyn KeyValueStore>> {
        if !self.is_degraded() {
            if let Some(primary) = &self.primary {
                return Ok(primary);
            }
        }
        self.fallback
            .as_ref()
            .ok_or_else(|| BridgeError::Storage("no stream cache backend available".to_string()))
    }

    /// Switches to the fallback after a primary failure.
    ///
    /// Returns true when the failed operation should be replayed on the
    /// fallback.
    fn degrade(&self, error: &BridgeError) -> bool {
        let (Some(primary), Some(fallback)) = (&self.primary, &self.fallback) else {
            return false;
        };
        if self.degraded.swap(true, Ordering::AcqRel) {
            return false;
        }

        warn!(
            from = primary.backend_name(),
            to = fallback.backend_name(),
            error = %error,
            "Stream cache backend failed, degrading to fallback"
        );
        if let Some(events) = &self.events {
            events
                .emit(CoreEvent::Cache(CacheEvent::BackendDegraded {
                    from: primary.backend_name().to_string(),
                    to: fallback.backend_name().to_string(),
                }))
                .ok();
        }
        true
    }
}

#[async_trait]
impl KeyValueStore for TieredStore {
    fn backend_name(&self) -> &'static str {
        self.active().map(|s| s.backend_name()).unwrap_or("none")
    }

    async fn is_available(&self) -> bool {
        match self.active() {
            Ok(store) => store.is_available().await,
            Err(_) => false,
        }
    }

    async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        match self.active()?.get(key).await {
            Err(e) if self.degrade(&e) => self.active()?.get(key).await,
            other => other,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> BridgeResult<()> {
        match self.active()?.set(key, value, ttl).await {
            Err(e) if self.degrade(&e) => self.active()?.set(key, value, ttl).await,
            other => other,
        }
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        match self.active()?.delete(key).await {
            Err(e) if self.degrade(&e) => self.active()?.delete(key).await,
            other => other,
        }
    }

    async fn keys(&self, prefix: &str) -> BridgeResult<Vec<String>> {
        match self.active()?.keys(prefix).await {
            Err(e) if self.degrade(&e) => self.active()?.keys(prefix).await,
            other => other,
        }
    }
}
