//! Bounded process-local cache for employee and branch names.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use nexus_core::EntityKind;

use crate::metrics::ResolutionMetrics;

/// A name observed from its owning service.
#[derive(Debug, Clone)]
pub struct LocalResolutionEntry {
    pub name: String,
    pub observed_at: Instant,
}

impl LocalResolutionEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observed_at: Instant::now(),
        }
    }

    /// Returns true while the entry is younger than `window`.
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.observed_at.elapsed() < window
    }
}

/// Short-lived name cache keyed by entity kind and id.
///
/// Entries are evicted when older than the freshness window or when the
/// capacity is reached, so the cache never grows past `max_capacity`.
/// Failed lookups are never stored.
#[derive(Clone)]
pub struct LocalNameCache {
    inner: Cache<(EntityKind, String), LocalResolutionEntry>,
    freshness: Duration,
}

impl LocalNameCache {
    pub fn new(freshness: Duration, max_capacity: u64) -> Self {
        let metrics = ResolutionMetrics;

        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(freshness)
            .eviction_listener(move |_key, _value, cause| {
                let reason = match cause {
                    moka::notification::RemovalCause::Expired => "ttl",
                    moka::notification::RemovalCause::Size => "capacity",
                    moka::notification::RemovalCause::Explicit => "manual",
                    moka::notification::RemovalCause::Replaced => "replaced",
                };
                metrics.record_local_eviction(reason);
            })
            .build();

        Self { inner, freshness }
    }

    /// Returns the cached name if it is still fresh.
    pub async fn get_fresh(&self, kind: EntityKind, id: &str) -> Option<String> {
        let key = (kind, id.to_string());

        match self.inner.get(&key).await {
            Some(entry) if entry.is_fresh(self.freshness) => Some(entry.name),
            Some(_) => {
                self.inner.invalidate(&key).await;
                None
            },
            None => None,
        }
    }

    /// Returns the cached name or runs `fetch` to obtain it.
    ///
    /// Concurrent misses for the same key share one `fetch`. An `Err` from
    /// `fetch` is returned to every waiter and nothing is cached.
    pub async fn get_or_try_fetch<F, Fut, E>(
        &self,
        kind: EntityKind,
        id: &str,
        fetch: F,
    ) -> Result<String, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: Send + Sync + 'static,
    {
        self.inner
            .try_get_with((kind, id.to_string()), async {
                fetch().await.map(LocalResolutionEntry::new)
            })
            .await
            .map(|entry| entry.name)
    }

    /// Records a name directly.
    pub async fn insert(&self, kind: EntityKind, id: &str, name: impl Into<String>) {
        self.inner
            .insert((kind, id.to_string()), LocalResolutionEntry::new(name))
            .await;
    }

    /// Approximate number of cached names.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Forces pending evictions (for tests mainly).
    #[cfg(test)]
    pub(crate) async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_insert_and_get_fresh() {
        let cache = LocalNameCache::new(Duration::from_secs(600), 100);
        cache.insert(EntityKind::Employee, "e1", "Ana").await;

        assert_eq!(
            cache.get_fresh(EntityKind::Employee, "e1").await,
            Some("Ana".to_string())
        );
        // Same id, different kind.
        assert_eq!(cache.get_fresh(EntityKind::Branch, "e1").await, None);
    }

    #[tokio::test]
    async fn test_stale_entry_is_not_returned() {
        let cache = LocalNameCache::new(Duration::from_millis(50), 100);
        cache.insert(EntityKind::Branch, "b1", "Downtown").await;

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.get_fresh(EntityKind::Branch, "b1").await, None);
    }

    #[test]
    fn test_entry_freshness() {
        let entry = LocalResolutionEntry::new("Ana");
        assert!(entry.is_fresh(Duration::from_secs(600)));
        assert!(!entry.is_fresh(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = LocalNameCache::new(Duration::from_secs(600), 100);

        let result: Result<String, Arc<&str>> = cache
            .get_or_try_fetch(EntityKind::Employee, "e1", || async { Err("timeout") })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get_fresh(EntityKind::Employee, "e1").await, None);

        let result: Result<String, Arc<&str>> = cache
            .get_or_try_fetch(EntityKind::Employee, "e1", || async { Ok("Ana".to_string()) })
            .await;
        assert_eq!(result.unwrap(), "Ana");
        assert_eq!(
            cache.get_fresh(EntityKind::Employee, "e1").await,
            Some("Ana".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache = Arc::new(LocalNameCache::new(Duration::from_secs(600), 100));
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = vec![];
        for _ in 0..50 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_fetch(EntityKind::Branch, "b1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok::<_, String>("Downtown".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "Downtown");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = LocalNameCache::new(Duration::from_secs(600), 10);
        for i in 0..200 {
            cache
                .insert(EntityKind::Employee, &format!("e{i}"), "Name")
                .await;
        }
        cache.sync().await;

        assert!(cache.entry_count() <= 10);
    }
}
