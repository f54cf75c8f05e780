//! AMQP 0-9-1 implementation of the broker traits on top of `lapin`.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::debug;

use crate::broker::{BrokerChannel, BrokerConnector, Delivery, DeliveryStream, Topology};
use crate::error::BrokerError;
use crate::supervisor::FaultNotifier;

/// Connects to an AMQP broker by URI.
pub struct AmqpConnector {
    uri: String,
}

impl AmqpConnector {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

#[async_trait]
impl BrokerConnector for AmqpConnector {
    async fn connect(&self, faults: FaultNotifier) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default())
            .await
            .map_err(BrokerError::connect)?;

        let connection_faults = faults.clone();
        connection.on_error(move |err| {
            connection_faults.notify(&format!("connection error: {err}"));
        });

        let channel = connection
            .create_channel()
            .await
            .map_err(BrokerError::channel)?;

        channel.on_error(move |err| {
            faults.notify(&format!("channel error: {err}"));
        });

        debug!("AMQP channel opened");

        Ok(Arc::new(AmqpChannel {
            connection,
            channel,
        }))
    }

    fn name(&self) -> &str {
        "amqp"
    }
}

/// A channel plus the connection that owns it.
///
/// The connection is kept alive for as long as the channel handle is cached.
struct AmqpChannel {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn declare_topology(&self, topology: &Topology) -> Result<(), BrokerError> {
        self.channel
            .exchange_declare(
                &topology.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::topology)?;

        self.channel
            .queue_declare(
                &topology.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::topology)?;

        self.channel
            .queue_bind(
                &topology.queue,
                &topology.exchange,
                &topology.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::topology)
    }

    async fn set_prefetch(&self, count: u16) -> Result<(), BrokerError> {
        self.channel
            .basic_qos(count, BasicQosOptions::default())
            .await
            .map_err(BrokerError::channel)
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<DeliveryStream, BrokerError> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::consume)?;

        Ok(consumer
            .map(|result| {
                result
                    .map(|delivery| Box::new(AmqpDelivery(delivery)) as Box<dyn Delivery>)
                    .map_err(BrokerError::consume)
            })
            .boxed())
    }
}

struct AmqpDelivery(lapin::message::Delivery);

#[async_trait]
impl Delivery for AmqpDelivery {
    fn body(&self) -> &[u8] {
        &self.0.data
    }

    async fn ack(&self) -> Result<(), BrokerError> {
        self.0
            .acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(BrokerError::ack)
    }

    async fn nack(&self, requeue: bool) -> Result<(), BrokerError> {
        self.0
            .acker
            .nack(BasicNackOptions {
                requeue,
                ..Default::default()
            })
            .await
            .map_err(BrokerError::ack)
    }
}
