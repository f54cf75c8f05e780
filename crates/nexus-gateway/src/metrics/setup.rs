//! Metrics setup and initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Error installing the Prometheus recorder.
pub type MetricsError = BuildError;

/// Buckets de latencia en segundos (1ms .. 10s).
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Inicializa el sistema de metricas y retorna el handle para el endpoint.
pub fn init_metrics() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(LATENCY_BUCKETS)?
        .install_recorder()?;

    super::http::register_http_metrics();
    super::resolution::register_resolution_metrics();

    info!("Metrics system initialized");
    Ok(handle)
}

/// Handle backed by a recorder that is not installed globally.
///
/// Used by tests and by routers that do not want to own the global recorder.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
