//! In-process broker for tests
//!
//! Behaves like a stream based broker with one consumer group per queue. Deliveries handed to a
//! consumer stay pending for that consumer until they are acknowledged, even across reconnects.
//! Tests may [sever](MemoryBroker::sever) all open connections and take the broker
//! [offline](MemoryBroker::set_online) to exercise recovery.

use crate::library::communication::broker::{
    BrokerConnection, Connector, RawDelivery, ReadCursor, TransportError,
};
use crate::library::communication::event::QueueDescriptor;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Error)]
enum MemoryBrokerError {
    #[error("broker is offline")]
    Offline,
    #[error("connection has been severed")]
    Severed,
}

struct Pending {
    sequence: u64,
    delivery: RawDelivery,
    since: Instant,
}

#[derive(Default)]
struct MemoryQueue {
    ready: VecDeque<(u64, RawDelivery)>,
    pending: HashMap<String, Vec<Pending>>,
    consumers: HashSet<String>,
}

struct MemoryState {
    online: bool,
    epoch: u64,
    next_id: u64,
    declarations: usize,
    highest_attempt: HashMap<String, u32>,
    queues: HashMap<String, MemoryQueue>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            online: true,
            epoch: 0,
            next_id: 0,
            declarations: 0,
            highest_attempt: HashMap::new(),
            queues: HashMap::new(),
        }
    }
}

/// Broker living entirely in memory, clones share the same state
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<MemoryState>>,
    notify: Arc<Notify>,
}

impl MemoryBroker {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    /// Breaks every connection that is currently open
    pub fn sever(&self) {
        self.lock().epoch += 1;
        self.notify.notify_waiters();
    }

    /// Controls whether new connections can be established
    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
    }

    /// Total number of queue declarations received
    pub fn declarations(&self) -> usize {
        self.lock().declarations
    }

    /// Number of distinct consumers that ever read from the queue
    pub fn consumers(&self, queue: &str) -> usize {
        self.lock()
            .queues
            .get(queue)
            .map(|q| q.consumers.len())
            .unwrap_or_default()
    }

    /// Number of messages that are waiting for delivery or settlement
    pub fn unsettled(&self, queue: &str) -> usize {
        self.lock()
            .queues
            .get(queue)
            .map(|q| q.ready.len() + q.pending.values().map(Vec::len).sum::<usize>())
            .unwrap_or_default()
    }

    /// Highest attempt counter any message published to the queue carried
    pub fn highest_attempt(&self, queue: &str) -> u32 {
        self.lock()
            .highest_attempt
            .get(queue)
            .copied()
            .unwrap_or_default()
    }

}

#[async_trait]
impl Connector for MemoryBroker {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<Self::Connection, TransportError> {
        let state = self.lock();

        if !state.online {
            return Err(TransportError::ConnectionLost(
                MemoryBrokerError::Offline.into(),
            ));
        }

        Ok(MemoryConnection {
            broker: self.clone(),
            epoch: state.epoch,
        })
    }
}

/// Connection to a [`MemoryBroker`]
#[derive(Clone)]
pub struct MemoryConnection {
    broker: MemoryBroker,
    epoch: u64,
}

impl MemoryConnection {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, TransportError> {
        let state = self.broker.lock();

        if state.epoch != self.epoch {
            Err(TransportError::ConnectionLost(
                MemoryBrokerError::Severed.into(),
            ))
        } else if !state.online {
            Err(TransportError::ConnectionLost(
                MemoryBrokerError::Offline.into(),
            ))
        } else {
            Ok(state)
        }
    }
}

#[async_trait]
impl BrokerConnection for MemoryConnection {
    async fn declare(&mut self, queue: &QueueDescriptor) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        state.declarations += 1;
        state.queues.entry(queue.key().to_owned()).or_default();
        Ok(())
    }

    async fn push(
        &mut self,
        queue: &QueueDescriptor,
        payload: &[u8],
        attempt: u32,
    ) -> Result<(), TransportError> {
        {
            let mut state = self.lock()?;
            state.next_id += 1;
            let id = state.next_id;

            let highest = state
                .highest_attempt
                .entry(queue.key().to_owned())
                .or_default();
            *highest = (*highest).max(attempt);

            state
                .queues
                .entry(queue.key().to_owned())
                .or_default()
                .ready
                .push_back((
                    id,
                    RawDelivery {
                        id: id.to_string(),
                        payload: payload.to_vec(),
                        attempt,
                    },
                ));
        }

        self.broker.notify.notify_waiters();
        Ok(())
    }

    async fn fetch(
        &mut self,
        queue: &str,
        consumer: &str,
        count: usize,
        cursor: &ReadCursor,
        block: Duration,
    ) -> Result<Vec<RawDelivery>, TransportError> {
        let deadline = Instant::now() + block;

        loop {
            let notified = self.broker.notify.notified();

            {
                let mut state = self.lock()?;
                let queue = state.queues.entry(queue.to_owned()).or_default();
                queue.consumers.insert(consumer.to_owned());

                match cursor {
                    ReadCursor::Pending(after) => {
                        let after = after.parse::<u64>().unwrap_or_default();

                        return Ok(queue
                            .pending
                            .get(consumer)
                            .map(|pending| {
                                pending
                                    .iter()
                                    .filter(|p| p.sequence > after)
                                    .take(count)
                                    .map(|p| p.delivery.clone())
                                    .collect()
                            })
                            .unwrap_or_default());
                    }
                    ReadCursor::New => {
                        let take = count.min(queue.ready.len());

                        if take > 0 {
                            let now = Instant::now();
                            let batch: Vec<_> = queue.ready.drain(..take).collect();
                            let deliveries = batch.iter().map(|(_, d)| d.clone()).collect();

                            queue
                                .pending
                                .entry(consumer.to_owned())
                                .or_default()
                                .extend(batch.into_iter().map(|(sequence, delivery)| Pending {
                                    sequence,
                                    delivery,
                                    since: now,
                                }));

                            return Ok(deliveries);
                        }
                    }
                }
            }

            if timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn claim(
        &mut self,
        queue: &str,
        consumer: &str,
        count: usize,
        min_idle: Duration,
    ) -> Result<Vec<RawDelivery>, TransportError> {
        let mut state = self.lock()?;
        let queue = state.queues.entry(queue.to_owned()).or_default();
        let now = Instant::now();

        let mut claimed = Vec::new();

        for pending in queue.pending.values_mut() {
            let mut index = 0;

            while index < pending.len() && claimed.len() < count {
                if now.duration_since(pending[index].since) >= min_idle {
                    claimed.push(pending.remove(index));
                } else {
                    index += 1;
                }
            }
        }

        let deliveries = claimed.iter().map(|p| p.delivery.clone()).collect();

        let own = queue.pending.entry(consumer.to_owned()).or_default();
        own.extend(claimed.into_iter().map(|p| Pending { since: now, ..p }));
        own.sort_by_key(|p| p.sequence);

        Ok(deliveries)
    }

    async fn ack(&mut self, queue: &str, id: &str) -> Result<(), TransportError> {
        let mut state = self.lock()?;

        if let Some(queue) = state.queues.get_mut(queue) {
            for pending in queue.pending.values_mut() {
                pending.retain(|p| p.delivery.id != id);
            }
        }

        Ok(())
    }

    async fn ping(&mut self) -> Result<(), TransportError> {
        self.lock().map(drop)
    }
}
