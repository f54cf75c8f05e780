//! Broker abstraction used by the supervisor and the consumer.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::BrokerError;
use crate::supervisor::FaultNotifier;

/// Exchange name for customer domain events.
pub const CUSTOMER_EXCHANGE: &str = "customer_events";

/// Queue this gateway consumes customer updates from.
pub const CUSTOMER_UPDATES_QUEUE: &str = "api_gateway_customer_updates";

/// Routing key for customer renames.
pub const CUSTOMER_UPDATED_KEY: &str = "customer.updated";

/// The exchange, queue and binding a consumer needs.
///
/// Both the exchange (topic-routed) and the queue are durable, and
/// declaration is idempotent on the broker side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

impl Topology {
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            routing_key: routing_key.into(),
        }
    }

    /// The fixed topology for customer rename events.
    pub fn customer_events() -> Self {
        Self::new(CUSTOMER_EXCHANGE, CUSTOMER_UPDATES_QUEUE, CUSTOMER_UPDATED_KEY)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::customer_events()
    }
}

/// Stream of deliveries from one subscription.
pub type DeliveryStream = BoxStream<'static, Result<Box<dyn Delivery>, BrokerError>>;

/// A single delivered message awaiting acknowledgement.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Raw message body.
    fn body(&self) -> &[u8];

    /// Positively acknowledges the message.
    async fn ack(&self) -> Result<(), BrokerError>;

    /// Negatively acknowledges the message, optionally asking for redelivery.
    async fn nack(&self, requeue: bool) -> Result<(), BrokerError>;
}

/// An open channel on a broker connection.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Returns false once the channel or its connection has closed.
    fn is_open(&self) -> bool;

    /// Declares the exchange, queue and binding. Must be a no-op when they exist.
    async fn declare_topology(&self, topology: &Topology) -> Result<(), BrokerError>;

    /// Limits unacknowledged deliveries in flight on this channel.
    async fn set_prefetch(&self, count: u16) -> Result<(), BrokerError>;

    /// Starts consuming `queue` with manual acknowledgement.
    async fn consume(&self, queue: &str, consumer_tag: &str)
    -> Result<DeliveryStream, BrokerError>;
}

/// Opens connections to a broker.
///
/// Implementations must route connection- and channel-level error
/// notifications to `faults` so the supervisor drops the handle.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Opens a connection and a channel on it.
    async fn connect(&self, faults: FaultNotifier) -> Result<Arc<dyn BrokerChannel>, BrokerError>;

    /// Returns the name of this connector, for logging.
    fn name(&self) -> &str;
}
