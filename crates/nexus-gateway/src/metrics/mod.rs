//! Metrics for the gateway.

pub mod http;
pub mod resolution;
pub mod setup;

pub use resolution::{ResolutionMetrics, ResolutionOutcome};
pub use setup::{MetricsError, detached_handle, init_metrics};
