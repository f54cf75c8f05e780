//! Push invalidation of customer names.
//!
//! Each delivered `customer.updated` event upserts `customer:{id}` in the
//! shared store with no expiry, then is acknowledged. Events that fail the
//! schema check, or whose cache write fails, are rejected without requeue:
//! a malformed body never becomes valid on redelivery.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use metrics::counter;
use nexus_core::{CustomerUpdated, KeyValueStore};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::broker::{BrokerChannel, Delivery};
use crate::error::ConsumeError;
use crate::supervisor::ConnectionSupervisor;

/// Configuration for the invalidation consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Consumer tag announced to the broker.
    pub consumer_tag: String,
    /// Unacknowledged deliveries in flight; 0 keeps the client default.
    pub prefetch: u16,
    /// Pause before resubscribing after a subscription ends.
    pub resubscribe_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            consumer_tag: "nexus-gateway".to_string(),
            prefetch: 0,
            resubscribe_delay: Duration::from_secs(1),
        }
    }
}

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Applied to the cache and acknowledged.
    Acked,
    /// Dropped without requeue.
    Rejected,
}

/// Handle for controlling a running consumer.
pub struct ConsumerHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl ConsumerHandle {
    /// Signals the consumer to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Subscribes to customer updates and writes them to the shared store.
pub struct InvalidationConsumer {
    supervisor: ConnectionSupervisor,
    store: Arc<dyn KeyValueStore>,
    config: ConsumerConfig,
}

impl InvalidationConsumer {
    pub fn new(
        supervisor: ConnectionSupervisor,
        store: Arc<dyn KeyValueStore>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            supervisor,
            store,
            config,
        }
    }

    /// Validates a message body and upserts the customer name.
    ///
    /// Applying the same event twice leaves the store in the same state as
    /// applying it once.
    pub async fn apply(&self, body: &[u8]) -> Result<CustomerUpdated, ConsumeError> {
        let event = CustomerUpdated::parse(body)?;

        // No expiry: a pushed name is authoritative until the next push.
        self.store.set(&event.cache_key(), &event.name, None).await?;

        Ok(event)
    }

    /// Applies one delivery and settles it with the broker.
    pub async fn handle_delivery(&self, delivery: &dyn Delivery) -> Outcome {
        match self.apply(delivery.body()).await {
            Ok(event) => {
                if let Err(e) = delivery.ack().await {
                    warn!(customer_id = %event.id, error = %e, "Failed to ack customer event");
                }
                counter!("nexus_events_total", "outcome" => "acked").increment(1);
                debug!(customer_id = %event.id, "Customer name updated from event");
                Outcome::Acked
            },
            Err(reason) => {
                error!(
                    reason = %reason,
                    body_len = delivery.body().len(),
                    "Dropping customer event"
                );
                if let Err(e) = delivery.nack(false).await {
                    warn!(error = %e, "Failed to reject customer event");
                }
                counter!("nexus_events_total", "outcome" => "rejected").increment(1);
                Outcome::Rejected
            },
        }
    }

    /// Starts the background subscription.
    ///
    /// Returns a handle that can be used to stop the consumer.
    pub fn start(self) -> ConsumerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ConsumerHandle { shutdown_tx };

        tokio::spawn(self.run(shutdown_rx));

        handle
    }

    /// Runs the subscription loop until shutdown.
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            let channel = tokio::select! {
                channel = self.supervisor.ensure_connected() => channel,
                _ = shutdown_requested(&mut shutdown_rx) => break,
            };

            if self.consume(channel.as_ref(), &mut shutdown_rx).await {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.resubscribe_delay) => {},
                _ = shutdown_requested(&mut shutdown_rx) => break,
            }
        }

        info!("Invalidation consumer shutting down");
    }

    /// Consumes from one channel until the subscription ends.
    ///
    /// Returns true when it stopped because of shutdown.
    async fn consume(
        &self,
        channel: &dyn BrokerChannel,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> bool {
        let queue = &self.supervisor.topology().queue;

        if self.config.prefetch > 0 {
            if let Err(e) = channel.set_prefetch(self.config.prefetch).await {
                warn!(error = %e, "Failed to set prefetch");
                self.supervisor.invalidate(&e.to_string());
                return false;
            }
        }

        let mut deliveries = match channel.consume(queue, &self.config.consumer_tag).await {
            Ok(deliveries) => deliveries,
            Err(e) => {
                warn!(queue = %queue, error = %e, "Failed to subscribe");
                self.supervisor.invalidate(&e.to_string());
                return false;
            },
        };

        info!(queue = %queue, "Subscribed to customer updates");

        loop {
            tokio::select! {
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => {
                        self.handle_delivery(delivery.as_ref()).await;
                    },
                    Some(Err(e)) => {
                        warn!(error = %e, "Delivery stream failed");
                        self.supervisor.invalidate(&e.to_string());
                        return false;
                    },
                    None => {
                        warn!(queue = %queue, "Delivery stream closed");
                        self.supervisor.invalidate("delivery stream closed");
                        return false;
                    },
                },
                _ = shutdown_requested(shutdown_rx) => return true,
            }
        }
    }
}

/// Resolves once shutdown is signalled or the handle is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
