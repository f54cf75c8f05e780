//! Cache-aside resolution of entity ids to display names.
//!
//! Two strategies cooperate:
//!
//! - **Employee / branch**: a bounded process-local cache with a freshness
//!   window. Misses call the owning directory service.
//! - **Customer**: the shared [`KeyValueStore`], kept coherent by push events.
//!   Misses call the CRM service and backfill the store with a TTL.
//!
//! Resolution never fails: an absent id or any lookup failure yields the
//! kind's fallback name. Failed lookups are never cached, so the next call
//! goes back to the network.

use std::sync::Arc;
use std::time::{Duration, Instant};

use nexus_core::{CacheError, EntityKind, KeyValueStore, customer_key};
use tracing::{debug, warn};

use crate::cache::LocalNameCache;
use crate::clients::{ClientError, DirectoryClient};
use crate::metrics::{ResolutionMetrics, ResolutionOutcome};

/// Configuracion del resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How long an employee/branch name is served locally (default: 10 min).
    pub freshness: Duration,
    /// Max employee/branch names held locally.
    pub local_capacity: u64,
    /// Expiry of customer names written back after a CRM lookup (default: 1 h).
    pub customer_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(600),
            local_capacity: 10_000,
            customer_ttl: Duration::from_secs(3600),
        }
    }
}

/// Result of writing a CRM-fetched customer name back to the shared store.
///
/// The write is best effort: callers may ignore `Skipped`, the name they
/// resolved is valid either way.
#[derive(Debug)]
#[must_use]
pub enum Backfill {
    Written,
    Skipped(CacheError),
}

impl Backfill {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Resolves employee, branch and customer ids to display names.
pub struct NameResolver {
    directory: Arc<dyn DirectoryClient>,
    store: Arc<dyn KeyValueStore>,
    local: LocalNameCache,
    config: ResolverConfig,
    metrics: ResolutionMetrics,
}

impl NameResolver {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        store: Arc<dyn KeyValueStore>,
        config: ResolverConfig,
    ) -> Self {
        let local = LocalNameCache::new(config.freshness, config.local_capacity);
        Self {
            directory,
            store,
            local,
            config,
            metrics: ResolutionMetrics,
        }
    }

    /// Resolves `id` to a display name, or the fallback for `kind`.
    ///
    /// A missing or blank id returns the fallback without any I/O.
    pub async fn resolve(&self, kind: EntityKind, id: Option<&str>, token: &str) -> String {
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            self.metrics.record(kind, ResolutionOutcome::Absent);
            return kind.fallback().to_string();
        };

        match kind {
            EntityKind::Employee | EntityKind::Branch => self.resolve_local(kind, id, token).await,
            EntityKind::Customer => self.resolve_customer(id, token).await,
        }
    }

    pub async fn employee_name(&self, id: Option<&str>, token: &str) -> String {
        self.resolve(EntityKind::Employee, id, token).await
    }

    pub async fn branch_name(&self, id: Option<&str>, token: &str) -> String {
        self.resolve(EntityKind::Branch, id, token).await
    }

    pub async fn customer_name(&self, id: Option<&str>, token: &str) -> String {
        self.resolve(EntityKind::Customer, id, token).await
    }

    /// Writes a customer name to the shared store with the backfill TTL.
    pub async fn backfill_customer(&self, id: &str, name: &str) -> Backfill {
        let key = customer_key(id);
        match self
            .store
            .set(&key, name, Some(self.config.customer_ttl))
            .await
        {
            Ok(()) => Backfill::Written,
            Err(err) => Backfill::Skipped(err),
        }
    }

    /// Employee/branch cache entries currently held.
    pub fn local_entries(&self) -> u64 {
        self.local.entry_count()
    }

    async fn resolve_local(&self, kind: EntityKind, id: &str, token: &str) -> String {
        if let Some(name) = self.local.get_fresh(kind, id).await {
            self.metrics.record(kind, ResolutionOutcome::LocalHit);
            return name;
        }

        let result = self
            .local
            .get_or_try_fetch(kind, id, || self.fetch(kind, id, token))
            .await;

        match result {
            Ok(name) => {
                self.metrics.record(kind, ResolutionOutcome::Fetched);
                name
            },
            Err(err) => self.fallback(kind, id, &err),
        }
    }

    async fn resolve_customer(&self, id: &str, token: &str) -> String {
        let kind = EntityKind::Customer;
        let key = customer_key(id);

        match self.store.get(&key).await {
            Ok(Some(name)) => {
                self.metrics.record(kind, ResolutionOutcome::StoreHit);
                return name;
            },
            Ok(None) => {},
            Err(err) => {
                // Treated as a miss; the CRM is still the source of truth.
                warn!(store = self.store.name(), key = %key, error = %err, "Shared cache read failed");
            },
        }

        match self.fetch(kind, id, token).await {
            Ok(name) => {
                if let Backfill::Skipped(err) = self.backfill_customer(id, &name).await {
                    warn!(
                        store = self.store.name(),
                        key = %key,
                        error = %err,
                        "Customer name backfill skipped"
                    );
                    self.metrics.record_backfill_failure();
                }
                self.metrics.record(kind, ResolutionOutcome::Fetched);
                name
            },
            Err(err) => self.fallback(kind, id, &err),
        }
    }

    async fn fetch(&self, kind: EntityKind, id: &str, token: &str) -> Result<String, ClientError> {
        let started = Instant::now();
        let result = self.directory.fetch_name(kind, id, token).await;
        self.metrics.record_upstream_latency(kind, started.elapsed());

        if result.is_ok() {
            debug!(kind = %kind, id = id, "Name fetched from owning service");
        }
        result
    }

    fn fallback(&self, kind: EntityKind, id: &str, err: &ClientError) -> String {
        warn!(kind = %kind, id = id, error = %err, "Name lookup failed, using fallback");
        self.metrics.record(kind, ResolutionOutcome::Fallback);
        kind.fallback().to_string()
    }
}
