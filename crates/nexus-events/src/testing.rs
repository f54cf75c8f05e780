//! In-memory fakes for the broker traits and the key/value store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use nexus_core::{CacheError, KeyValueStore};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::broker::{BrokerChannel, BrokerConnector, Delivery, DeliveryStream, Topology};
use crate::error::BrokerError;
use crate::supervisor::FaultNotifier;

/// How a fake delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Acked,
    Nacked { requeue: bool },
}

pub struct FakeDelivery {
    body: Vec<u8>,
    log: Arc<Mutex<Vec<Settled>>>,
}

impl FakeDelivery {
    pub fn new(body: &[u8]) -> (Self, Arc<Mutex<Vec<Settled>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                body: body.to_vec(),
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    fn body(&self) -> &[u8] {
        &self.body
    }

    async fn ack(&self) -> Result<(), BrokerError> {
        self.log.lock().push(Settled::Acked);
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> Result<(), BrokerError> {
        self.log.lock().push(Settled::Nacked { requeue });
        Ok(())
    }
}

pub struct FakeChannel {
    open: AtomicBool,
    declared: AtomicU32,
    fail_declare: Arc<AtomicU32>,
    prefetch: Mutex<Option<u16>>,
    bodies: Mutex<Vec<Vec<u8>>>,
    log: Arc<Mutex<Vec<Settled>>>,
}

impl FakeChannel {
    pub fn declared_topologies(&self) -> u32 {
        self.declared.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn prefetch(&self) -> Option<u16> {
        *self.prefetch.lock()
    }
}

#[async_trait]
impl BrokerChannel for FakeChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn declare_topology(&self, _topology: &Topology) -> Result<(), BrokerError> {
        let remaining = self.fail_declare.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_declare.store(remaining - 1, Ordering::SeqCst);
            return Err(BrokerError::topology("PRECONDITION_FAILED"));
        }
        self.declared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_prefetch(&self, count: u16) -> Result<(), BrokerError> {
        *self.prefetch.lock() = Some(count);
        Ok(())
    }

    async fn consume(
        &self,
        _queue: &str,
        _consumer_tag: &str,
    ) -> Result<DeliveryStream, BrokerError> {
        let log = Arc::clone(&self.log);
        let bodies = std::mem::take(&mut *self.bodies.lock());
        let deliveries: Vec<Result<Box<dyn Delivery>, BrokerError>> = bodies
            .into_iter()
            .map(|body| {
                Ok(Box::new(FakeDelivery {
                    body,
                    log: Arc::clone(&log),
                }) as Box<dyn Delivery>)
            })
            .collect();

        // Stay subscribed after the scripted deliveries.
        Ok(stream::iter(deliveries).chain(stream::pending()).boxed())
    }
}

/// Connector that fails a scripted number of times before succeeding.
pub struct FakeConnector {
    fail_remaining: AtomicU32,
    fail_declare: Arc<AtomicU32>,
    calls: AtomicU32,
    call_times: Mutex<Vec<Instant>>,
    channels: Mutex<Vec<Arc<FakeChannel>>>,
    notifiers: Mutex<Vec<FaultNotifier>>,
    bodies: Mutex<Vec<Vec<u8>>>,
    log: Arc<Mutex<Vec<Settled>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: u32) -> Self {
        Self {
            fail_remaining: AtomicU32::new(failures),
            fail_declare: Arc::new(AtomicU32::new(0)),
            calls: AtomicU32::new(0),
            call_times: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
            notifiers: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Bodies delivered by the next channel's subscription.
    pub fn with_deliveries(self, bodies: &[&[u8]]) -> Self {
        *self.bodies.lock() = bodies.iter().map(|b| b.to_vec()).collect();
        self
    }

    pub fn fail_declare_times(&self, times: u32) {
        self.fail_declare.store(times, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().clone()
    }

    pub fn channel(&self, index: usize) -> Arc<FakeChannel> {
        Arc::clone(&self.channels.lock()[index])
    }

    pub fn notifier(&self, index: usize) -> FaultNotifier {
        self.notifiers.lock()[index].clone()
    }

    pub fn settled(&self) -> Vec<Settled> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl BrokerConnector for FakeConnector {
    async fn connect(&self, faults: FaultNotifier) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().push(Instant::now());

        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(BrokerError::connect("connection refused"));
        }

        let channel = Arc::new(FakeChannel {
            open: AtomicBool::new(true),
            declared: AtomicU32::new(0),
            fail_declare: Arc::clone(&self.fail_declare),
            prefetch: Mutex::new(None),
            bodies: Mutex::new(std::mem::take(&mut *self.bodies.lock())),
            log: Arc::clone(&self.log),
        });

        self.channels.lock().push(Arc::clone(&channel));
        self.notifiers.lock().push(faults);
        Ok(channel)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Key/value store that records every write.
#[derive(Default)]
pub struct RecordingStore {
    entries: Mutex<HashMap<String, (String, Option<Duration>)>>,
    writes: AtomicU32,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn entry(&self, key: &str) -> Option<(String, Option<Duration>)> {
        self.entries.lock().get(key).cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, (String, Option<Duration>)> {
        self.entries.lock().clone()
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().get(key).map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::connection("store unavailable"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
