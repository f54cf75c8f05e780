//! Application state.

use std::sync::Arc;

use nexus_events::{ConnectionState, ConnectionSupervisor};

use crate::aggregation::InvoiceAggregator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<InvoiceAggregator>,
    /// Absent when the gateway runs without the event consumer.
    supervisor: Option<ConnectionSupervisor>,
}

impl AppState {
    pub fn new(aggregator: InvoiceAggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            supervisor: None,
        }
    }

    /// Attaches the broker supervisor so its state shows up in health checks.
    pub fn with_supervisor(mut self, supervisor: ConnectionSupervisor) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn aggregator(&self) -> &InvoiceAggregator {
        &self.aggregator
    }

    pub fn broker_state(&self) -> Option<ConnectionState> {
        self.supervisor.as_ref().map(ConnectionSupervisor::state)
    }
}
