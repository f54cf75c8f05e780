//! In-process key/value store using Moka.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use nexus_core::{CacheError, KeyValueStore};

#[derive(Debug, Clone)]
struct StoredValue {
    value: Arc<str>,
    ttl: Option<Duration>,
}

/// Expiry taken from each entry; an overwrite replaces the previous expiry.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Bounded key/value store living in this process.
///
/// Mirrors the semantics of the shared store (per-key optional expiry,
/// overwrite resets expiry) so it can stand in for Redis in local
/// development and tests. Not shared between gateway instances.
///
/// # Examples
///
/// ```
/// use nexus_core::KeyValueStore;
/// use nexus_gateway::cache::MemoryStore;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new(1_000);
/// store.set("customer:c1", "Jane Doe", None).await.unwrap();
/// assert_eq!(store.get("customer:c1").await.unwrap().as_deref(), Some("Jane Doe"));
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Cache<String, StoredValue>,
}

impl MemoryStore {
    /// Creates a store holding at most `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .inner
            .get(key)
            .await
            .map(|stored| stored.value.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.inner
            .insert(
                key.to_string(),
                StoredValue {
                    value: Arc::from(value),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
