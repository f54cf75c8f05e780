//! Error types shared across the Nexus crates.
//!
//! Name resolution itself never fails outwards (a missing name becomes a
//! sentinel string), so the errors here only describe the two places where a
//! failure is observable: writing to the shared cache and accepting a push
//! event from the broker.

use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore) implementation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be reached or the connection dropped mid-command.
    #[error("cache connection error: {0}")]
    Connection(String),

    /// The store answered with an error for the issued command.
    #[error("cache command '{command}' failed: {message}")]
    Command {
        /// Command name (GET, SET, ...)
        command: String,
        /// Store-reported failure
        message: String,
    },
}

impl CacheError {
    /// Creates a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a command error.
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Reasons a push event is refused by the schema check.
///
/// Every variant is permanent: redelivering the same bytes yields the same
/// error, which is why the consumer drops these messages instead of
/// requeueing them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The body is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The body is valid JSON but not an object.
    #[error("event body must be a JSON object")]
    NotAnObject,

    /// A required field is absent or null.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A required field has the wrong type or an empty value.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}
