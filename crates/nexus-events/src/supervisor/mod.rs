//! Broker connection supervision.
//!
//! The supervisor owns at most one cached channel. Callers ask for it through
//! [`ConnectionSupervisor::ensure_connected`]; when no healthy channel is
//! cached the first caller runs the connect protocol (connect, declare
//! topology) with capped exponential backoff until it succeeds, while later
//! callers wait for it and then reuse the result.

mod backoff;
mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use backoff::Backoff;
pub use state::{ConnectionState, SupervisorStatus};

use crate::broker::{BrokerChannel, BrokerConnector, Topology};
use crate::error::BrokerError;

/// Configuration for the connection supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound for the delay between attempts.
    pub max_backoff: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(2_000),
            max_backoff: Duration::from_millis(30_000),
        }
    }
}

/// Supervises a single broker connection and its channel.
///
/// Cloning is cheap; clones share the same connection.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    connector: Arc<dyn BrokerConnector>,
    topology: Topology,
    config: SupervisorConfig,
    /// Cached channel tagged with the generation of the connect that produced it.
    channel: Mutex<Option<(u64, Arc<dyn BrokerChannel>)>>,
    /// Serialises the connect protocol.
    connect_lock: tokio::sync::Mutex<()>,
    generation: AtomicU64,
    status: SupervisorStatus,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor. No connection is attempted until the first
    /// call to [`ensure_connected`](Self::ensure_connected).
    pub fn new(
        connector: Arc<dyn BrokerConnector>,
        topology: Topology,
        config: SupervisorConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            inner: Arc::new(Inner {
                connector,
                topology,
                config,
                channel: Mutex::new(None),
                connect_lock: tokio::sync::Mutex::new(()),
                generation: AtomicU64::new(0),
                status: SupervisorStatus::new(),
                state_tx,
            }),
        }
    }

    /// Returns a healthy channel, connecting first if needed.
    ///
    /// Never fails: connection errors of every kind are retried forever with
    /// capped exponential backoff, sleeping between attempts.
    pub async fn ensure_connected(&self) -> Arc<dyn BrokerChannel> {
        if let Some(channel) = self.healthy_channel() {
            return channel;
        }

        let _guard = self.inner.connect_lock.lock().await;

        // Another caller may have connected while we waited for the lock.
        if let Some(channel) = self.healthy_channel() {
            return channel;
        }

        self.connect_with_retry().await
    }

    /// Drops the cached channel so the next call to `ensure_connected`
    /// rebuilds from scratch.
    pub fn invalidate(&self, reason: &str) {
        self.inner.invalidate(None, reason);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribes to connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Attempt counters and last error.
    pub fn status(&self) -> &SupervisorStatus {
        &self.inner.status
    }

    /// The topology declared after every connect.
    pub fn topology(&self) -> &Topology {
        &self.inner.topology
    }

    fn healthy_channel(&self) -> Option<Arc<dyn BrokerChannel>> {
        let mut cached = self.inner.channel.lock();

        match cached.as_ref() {
            Some((_, channel)) if channel.is_open() => return Some(Arc::clone(channel)),
            Some(_) => {},
            None => return None,
        }

        // Closed without an error callback reaching us.
        *cached = None;
        drop(cached);
        self.inner.status.record_fault("channel closed");
        self.inner.set_state(ConnectionState::Faulted);
        None
    }

    async fn connect_with_retry(&self) -> Arc<dyn BrokerChannel> {
        let mut backoff = Backoff::new(
            self.inner.config.initial_backoff,
            self.inner.config.max_backoff,
        );
        let mut attempt: u32 = 1;

        loop {
            self.inner.set_state(ConnectionState::Connecting);
            self.inner.status.record_attempt();
            counter!("nexus_broker_connect_attempts_total").increment(1);

            info!(
                attempt,
                connector = self.inner.connector.name(),
                "Connecting to broker"
            );

            match self.try_connect().await {
                Ok(channel) => {
                    self.inner.status.record_success();
                    self.inner.set_state(ConnectionState::Connected);
                    info!(
                        attempt,
                        exchange = %self.inner.topology.exchange,
                        queue = %self.inner.topology.queue,
                        "Broker connected and topology declared"
                    );
                    return channel;
                },
                Err(e) => {
                    let delay = backoff.next_delay();
                    self.inner.status.record_failure(e.to_string());
                    self.inner.set_state(ConnectionState::Faulted);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Broker connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                },
            }
        }
    }

    async fn try_connect(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let faults = FaultNotifier {
            inner: Arc::downgrade(&self.inner),
            generation,
        };

        let channel = self.inner.connector.connect(faults).await?;
        channel.declare_topology(&self.inner.topology).await?;

        *self.inner.channel.lock() = Some((generation, Arc::clone(&channel)));
        Ok(channel)
    }
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Broker connection state changed");
        }
    }

    fn invalidate(&self, generation: Option<u64>, reason: &str) {
        let mut cached = self.channel.lock();

        match (generation, cached.as_ref()) {
            (_, None) => return,
            (Some(from), Some((current, _))) if from != *current => {
                debug!(generation = from, "Ignoring fault from a replaced connection");
                return;
            },
            _ => {},
        }

        *cached = None;
        drop(cached);

        self.status.record_fault(reason);
        self.set_state(ConnectionState::Faulted);
        warn!(reason = %reason, "Broker connection invalidated");
    }
}

/// Handed to a [`BrokerConnector`] so error callbacks can drop the cached
/// channel.
///
/// Holds only a weak reference, and only affects the connection it was
/// created for: a late notification from a replaced connection is ignored.
#[derive(Clone)]
pub struct FaultNotifier {
    inner: Weak<Inner>,
    generation: u64,
}

impl FaultNotifier {
    /// A notifier not attached to any supervisor.
    pub fn detached() -> Self {
        Self {
            inner: Weak::new(),
            generation: 0,
        }
    }

    /// Reports that the connection or channel failed. Never blocks.
    pub fn notify(&self, reason: &str) {
        if let Some(inner) = self.inner.upgrade() {
            inner.invalidate(Some(self.generation), reason);
        }
    }
}
