//! Key/value store abstraction shared by the resolver and the event consumer.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// A remote or in-process key/value store with optional per-key expiry.
///
/// Single-key reads and writes must be atomic at the store level; nothing in
/// Nexus relies on multi-key transactions.
///
/// # Implementors
///
/// - `RedisStore` - shared store backed by Redis
/// - `MemoryStore` - bounded in-process store for local development and tests
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Upserts `value` under `key`.
    ///
    /// With `ttl == None` the entry never expires and replaces any expiry the
    /// previous value carried.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Returns the name of this store, for logging.
    fn name(&self) -> &str;
}
