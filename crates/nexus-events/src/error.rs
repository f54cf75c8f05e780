//! Error types for broker plumbing and event handling.

use nexus_core::{CacheError, EventError};

/// Errors raised by a broker connection or channel.
///
/// The supervisor does not distinguish between these: every variant is
/// retried the same way.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Opening the connection failed (network, auth, malformed URL).
    #[error("broker connection failed: {0}")]
    Connect(String),

    /// Opening or using a channel failed.
    #[error("broker channel error: {0}")]
    Channel(String),

    /// Declaring the exchange, queue or binding failed.
    #[error("topology declaration failed: {0}")]
    Topology(String),

    /// Starting or reading a consumer failed.
    #[error("consume error: {0}")]
    Consume(String),

    /// Acknowledging or rejecting a delivery failed.
    #[error("acknowledgement failed: {0}")]
    Ack(String),
}

impl BrokerError {
    pub fn connect(msg: impl ToString) -> Self {
        Self::Connect(msg.to_string())
    }

    pub fn channel(msg: impl ToString) -> Self {
        Self::Channel(msg.to_string())
    }

    pub fn topology(msg: impl ToString) -> Self {
        Self::Topology(msg.to_string())
    }

    pub fn consume(msg: impl ToString) -> Self {
        Self::Consume(msg.to_string())
    }

    pub fn ack(msg: impl ToString) -> Self {
        Self::Ack(msg.to_string())
    }
}

/// Why a delivered event was not applied to the cache.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    /// The body failed the required-fields schema.
    #[error("rejected payload: {0}")]
    Schema(#[from] EventError),

    /// The cache write failed.
    #[error("cache write failed: {0}")]
    Store(#[from] CacheError),
}
