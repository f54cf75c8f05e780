//! Name resolution metrics.

use std::time::Duration;

use metrics::{counter, histogram};
use nexus_core::EntityKind;

/// How a single name resolution was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// No id on the record, nothing was looked up.
    Absent,
    /// Served from the process-local cache.
    LocalHit,
    /// Served from the shared store.
    StoreHit,
    /// Fetched from the owning service.
    Fetched,
    /// Lookup failed and the fallback name was used.
    Fallback,
}

impl ResolutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::LocalHit => "local_hit",
            Self::StoreHit => "store_hit",
            Self::Fetched => "fetched",
            Self::Fallback => "fallback",
        }
    }
}

/// Registra las metricas de resolucion.
pub fn register_resolution_metrics() {
    metrics::describe_counter!(
        "nexus_resolution_total",
        "Name resolutions by entity kind and outcome"
    );
    metrics::describe_counter!(
        "nexus_backfill_failures_total",
        "Customer names that could not be written back to the shared store"
    );
    metrics::describe_counter!(
        "nexus_local_cache_evictions_total",
        "Evictions from the local name cache"
    );
    metrics::describe_histogram!(
        "nexus_upstream_request_seconds",
        "Latency of directory lookups by entity kind"
    );
}

/// Recorder de metricas de resolucion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionMetrics;

impl ResolutionMetrics {
    pub fn record(&self, kind: EntityKind, outcome: ResolutionOutcome) {
        counter!(
            "nexus_resolution_total",
            "kind" => kind.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }

    pub fn record_backfill_failure(&self) {
        counter!("nexus_backfill_failures_total").increment(1);
    }

    pub fn record_local_eviction(&self, reason: &'static str) {
        counter!("nexus_local_cache_evictions_total", "reason" => reason).increment(1);
    }

    pub fn record_upstream_latency(&self, kind: EntityKind, elapsed: Duration) {
        histogram!("nexus_upstream_request_seconds", "kind" => kind.as_str())
            .record(elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels_are_distinct() {
        let labels = [
            ResolutionOutcome::Absent,
            ResolutionOutcome::LocalHit,
            ResolutionOutcome::StoreHit,
            ResolutionOutcome::Fetched,
            ResolutionOutcome::Fallback,
        ]
        .map(|o| o.as_str());

        let mut sorted = labels.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), labels.len());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = ResolutionMetrics;
        metrics.record(EntityKind::Customer, ResolutionOutcome::StoreHit);
        metrics.record_backfill_failure();
        metrics.record_local_eviction("ttl");
    }
}
