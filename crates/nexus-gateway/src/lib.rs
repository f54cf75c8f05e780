//! Nexus Gateway - invoice aggregation with cross-service name resolution.
//!
//! Serves billing invoices enriched with employee, branch and customer display
//! names. Names come from a two-level cache kept coherent by push events from
//! the CRM, with direct lookups against the owning services on a miss.

pub mod aggregation;
pub mod cache;
pub mod clients;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod resolver;
pub mod server;
pub mod settings;
pub mod state;

pub use aggregation::{AggregationError, AggregatorConfig, InvoiceAggregator};
pub use error::AppError;
pub use resolver::{Backfill, NameResolver, ResolverConfig};
pub use server::{create_router, create_router_with_state, run_server_with_state, serve};
pub use settings::{CacheBackend, Settings, SettingsError};
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
