use crate::library::communication::event::{
    QueueDescriptor, QueueProvider, RawQueueEntry, Settlement,
};
use crate::library::communication::implementation::json::JsonQueueEntry;
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Shared record of how entries have been settled
#[derive(Clone, Default)]
pub struct SettlementLog(Arc<Mutex<Vec<Settlement>>>);

impl SettlementLog {
    fn record(&self, settlement: Settlement) {
        self.0.lock().unwrap().push(settlement);
    }

    /// Settlements in the order they happened
    pub fn settlements(&self) -> Vec<Settlement> {
        self.0.lock().unwrap().clone()
    }
}

/// Queue entry with a fixed payload which records its settlement
pub struct MockQueueEntry {
    payload: Vec<u8>,
    attempt: u32,
    log: SettlementLog,
}

impl MockQueueEntry {
    pub fn new(payload: &[u8]) -> Self {
        Self::with_log(payload, SettlementLog::default())
    }

    pub fn with_log(payload: &[u8], log: SettlementLog) -> Self {
        Self {
            payload: payload.to_vec(),
            attempt: 1,
            log,
        }
    }

    pub fn log(&self) -> SettlementLog {
        self.log.clone()
    }
}

#[async_trait]
impl RawQueueEntry for MockQueueEntry {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        self.log.record(Settlement::Acknowledged);
        Ok(())
    }

    async fn reject(&mut self, requeue: bool) -> EmptyResult {
        self.log.record(if requeue {
            Settlement::Requeued
        } else {
            Settlement::Discarded
        });
        Ok(())
    }
}

impl JsonQueueEntry for MockQueueEntry {}

/// Queue provider handing out entries that are fed to it manually
///
/// Only a single consumption is supported. The stream ends once the provider has been closed.
#[derive(Clone)]
pub struct MockQueueProvider {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<MockQueueEntry>>>>,
    receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<MockQueueEntry>>>>,
    log: SettlementLog,
}

impl Default for MockQueueProvider {
    fn default() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            receiver: Arc::new(Mutex::new(Some(receiver))),
            log: SettlementLog::default(),
        }
    }
}

impl MockQueueProvider {
    /// Makes a serialized message available for consumption
    pub fn feed(&self, payload: &[u8]) {
        let entry = MockQueueEntry::with_log(payload, self.log.clone());
        if let Some(sender) = self.sender.lock().unwrap().as_ref() {
            sender.send(entry).unwrap();
        }
    }

    /// Ends the stream after all entries fed so far have been consumed
    pub fn close(&self) {
        self.sender.lock().unwrap().take();
    }

    /// Settlements of all entries handed out by this provider
    pub fn log(&self) -> SettlementLog {
        self.log.clone()
    }
}

#[async_trait]
impl QueueProvider for MockQueueProvider {
    type Entry = MockQueueEntry;

    async fn consume(
        &self,
        _queue: &QueueDescriptor,
        _consumer: &str,
        _prefetch: usize,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .expect("MockQueueProvider can only be consumed once");

        let stream = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|entry| (Ok(entry), receiver))
        });

        Ok(stream.boxed())
    }
}
