//! Persistent Key-Value Storage
//!
//! One capability interface covers every persistence backend the engine can
//! run on: a durable structured store (SQLite on desktop, IndexedDB in a
//! browser) and a simpler key/value fallback (in-memory, localStorage).
//! Which one is used is decided once at startup; nothing downstream branches
//! on backend identity.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Key-value store with optional per-entry TTL.
///
/// # Semantics
///
/// - `get` returns `Ok(None)` for missing *and* expired keys.
/// - `set` overwrites unconditionally (last write wins).
/// - `delete` of a missing key is not an error.
///
/// Any method may fail with a storage error; callers are expected to treat
/// failures as a miss rather than abort.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
/// use std::time::Duration;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.set("track:1:HIGH", "{...}", Some(Duration::from_secs(3600))).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short backend name for diagnostics (`"sqlite"`, `"memory"`, ...).
    fn backend_name(&self) -> &'static str;

    /// Whether the backend is usable right now.
    async fn is_available(&self) -> bool {
        true
    }

    /// Retrieve a value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, expiring after `ttl` when provided.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Remove a value.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List stored keys starting with `prefix`.
    ///
    /// Entries whose TTL passed but that were not removed yet are listed
    /// too, so a caller sweeping stale entries can find them.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove every key starting with `prefix`, returning how many were removed.
    async fn clear_prefix(&self, prefix: &str) -> Result<usize> {
        let keys = self.keys(prefix).await?;
        let count = keys.len();
        for key in keys {
            self.delete(&key).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use mockall::{mock, predicate::eq};

    mock! {
        Store {}

        #[async_trait]
        impl KeyValueStore for Store {
            fn backend_name(&self) -> &'static str;
            async fn get(&self, key: &str) -> Result<Option<String>>;
            async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
            async fn delete(&self, key: &str) -> Result<()>;
            async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
        }
    }

    #[tokio::test]
    async fn test_clear_prefix_deletes_listed_keys() {
        let mut store = MockStore::new();
        store
            .expect_keys()
            .with(eq("stream:"))
            .returning(|_| Ok(vec!["stream:a:HIGH".into(), "stream:b:HIGH".into()]));
        store.expect_delete().times(2).returning(|_| Ok(()));

        assert_eq!(store.clear_prefix("stream:").await.unwrap(), 2);
        assert!(store.is_available().await);
    }

    #[tokio::test]
    async fn test_clear_prefix_stops_on_delete_failure() {
        let mut store = MockStore::new();
        store
            .expect_keys()
            .returning(|_| Ok(vec!["stream:a:HIGH".into(), "stream:b:HIGH".into()]));
        store
            .expect_delete()
            .times(1)
            .returning(|_| Err(BridgeError::Storage("disk full".into())));

        let err = store.clear_prefix("stream:").await.unwrap_err();
        assert!(matches!(err, BridgeError::Storage(_)));
    }
}
