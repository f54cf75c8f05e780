//! Broker connection state tracking.

use std::fmt;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

/// Lifecycle of the supervised broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No connection has been attempted yet.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// A healthy channel is cached.
    Connected,
    /// The last attempt failed or a live connection dropped.
    Faulted,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Faulted => "FAULTED",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters and timestamps describing the supervised connection.
///
/// Methods that take more than one lock take them in field order starting at
/// `last_error`: `last_error`, `consecutive_failures`, `connected_at`.
#[derive(Debug)]
pub struct SupervisorStatus {
    /// Connect attempts made since startup.
    attempts: RwLock<u64>,
    /// Failed attempts since the last successful connect.
    consecutive_failures: RwLock<u32>,
    /// The last connect or runtime error, if any.
    last_error: RwLock<Option<String>>,
    /// When the current connection was established.
    connected_at: RwLock<Option<Instant>>,
}

impl SupervisorStatus {
    pub fn new() -> Self {
        Self {
            attempts: RwLock::new(0),
            consecutive_failures: RwLock::new(0),
            last_error: RwLock::new(None),
            connected_at: RwLock::new(None),
        }
    }

    /// Records the start of a connect attempt.
    pub fn record_attempt(&self) {
        *self.attempts.write() += 1;
    }

    /// Records a successful connect.
    pub fn record_success(&self) {
        let mut last_error = self.last_error.write();
        let mut consecutive_failures = self.consecutive_failures.write();
        let mut connected_at = self.connected_at.write();

        *last_error = None;
        *consecutive_failures = 0;
        *connected_at = Some(Instant::now());
    }

    /// Records a failed attempt.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut last_error = self.last_error.write();
        let mut consecutive_failures = self.consecutive_failures.write();

        *last_error = Some(error.into());
        *consecutive_failures += 1;
    }

    /// Records the loss of an established connection.
    pub fn record_fault(&self, error: impl Into<String>) {
        let mut last_error = self.last_error.write();
        let mut connected_at = self.connected_at.write();

        *last_error = Some(error.into());
        *connected_at = None;
    }

    pub fn attempts(&self) -> u64 {
        *self.attempts.read()
    }

    pub fn consecutive_failures(&self) -> u32 {
        *self.consecutive_failures.read()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn connected_at(&self) -> Option<Instant> {
        *self.connected_at.read()
    }
}

impl Default for SupervisorStatus {
    fn default() -> Self {
        Self::new()
    }
}
