use super::{BrokerConnection, ConnectionManager, Connector, Lease, RawDelivery, ReadCursor};
use crate::library::communication::event::{QueueDescriptor, QueueProvider, RawQueueEntry};
use crate::library::communication::implementation::json::JsonQueueEntry;
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

const DEFAULT_BLOCK_DURATION: Duration = Duration::from_secs(5);
const DEFAULT_CLAIM_IDLE: Duration = Duration::from_secs(60);
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// [`QueueProvider`] implementation on top of a [`ConnectionManager`]
///
/// Each consumption uses a dedicated connection for its blocking reads. When that connection
/// drops, the failure is reported to the manager and reading resumes on a new connection once
/// the manager recovered. Deliveries that were handed out but not settled before the failure
/// are read again first, so the returned stream never ends on its own.
///
/// Deliveries which another consumer left unsettled for longer than the claim idle time are
/// taken over, so work picked up by a consumer that crashed is not lost. Processing a delivery
/// must take less than the claim idle time, otherwise it may be processed twice.
pub struct BrokerQueueProvider<C: Connector> {
    manager: ConnectionManager<C>,
    block: Duration,
    claim_idle: Duration,
}

impl<C: Connector> BrokerQueueProvider<C> {
    /// Creates a new instance reading through the given manager
    pub fn new(manager: ConnectionManager<C>) -> Self {
        Self {
            manager,
            block: DEFAULT_BLOCK_DURATION,
            claim_idle: DEFAULT_CLAIM_IDLE,
        }
    }

    /// Overrides how long a single read blocks while waiting for new deliveries
    pub fn with_block_duration(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    /// Overrides how long a delivery has to be left unsettled before it is taken over
    pub fn with_claim_idle(mut self, claim_idle: Duration) -> Self {
        self.claim_idle = claim_idle;
        self
    }
}

impl<C: Connector> Clone for BrokerQueueProvider<C> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            block: self.block,
            claim_idle: self.claim_idle,
        }
    }
}

struct Consumption<C: Connector> {
    manager: ConnectionManager<C>,
    queue: QueueDescriptor,
    consumer: String,
    prefetch: usize,
    block: Duration,
    claim_idle: Duration,
    last_claim: Option<Instant>,
    channel: Option<Lease<C::Connection>>,
    cursor: ReadCursor,
    buffer: VecDeque<RawDelivery>,
}

impl<C: Connector> Consumption<C> {
    fn entry(&self, delivery: RawDelivery) -> BrokerQueueEntry<C> {
        BrokerQueueEntry {
            manager: self.manager.clone(),
            queue: self.queue.clone(),
            delivery,
            requeued: false,
            settled: false,
        }
    }

    async fn next(mut self) -> Option<(Result<BrokerQueueEntry<C>, BoxedError>, Self)> {
        loop {
            if let Some(delivery) = self.buffer.pop_front() {
                let entry = self.entry(delivery);
                return Some((Ok(entry), self));
            }

            let channel = match self.channel.as_mut() {
                Some(channel) => channel,
                None => {
                    match self.manager.open_channel().await {
                        Ok(channel) => {
                            debug!(queue = self.queue.key(), consumer = %self.consumer, "Opened consumer channel");
                            self.channel = Some(channel);
                            self.cursor = ReadCursor::pending_head();
                        }
                        Err(error) => {
                            sleep(ERROR_BACKOFF).await;
                            return Some((Err(error.into()), self));
                        }
                    }
                    continue;
                }
            };

            // Abandoned deliveries are looked for at most once per blocking read
            let claim_due = self.cursor == ReadCursor::New
                && self
                    .last_claim
                    .map_or(true, |claimed_at| claimed_at.elapsed() >= self.block);

            let result = if claim_due {
                self.last_claim = Some(Instant::now());

                channel
                    .connection
                    .claim(
                        self.queue.key(),
                        &self.consumer,
                        self.prefetch,
                        self.claim_idle,
                    )
                    .await
            } else {
                channel
                    .connection
                    .fetch(
                        self.queue.key(),
                        &self.consumer,
                        self.prefetch,
                        &self.cursor,
                        self.block,
                    )
                    .await
                    .map(|batch| {
                        self.cursor.advance(&batch);
                        batch
                    })
            };

            match result {
                Ok(batch) => {
                    if claim_due && !batch.is_empty() {
                        debug!(queue = self.queue.key(), count = batch.len(), "Claimed abandoned deliveries");
                    }

                    self.buffer.extend(batch);
                }
                Err(error) if error.is_connection_lost() => {
                    warn!(?error, queue = self.queue.key(), "Consumer channel failed");
                    if let Some(channel) = self.channel.take() {
                        self.manager.report_failure(&channel);
                    }
                }
                Err(error) => {
                    sleep(ERROR_BACKOFF).await;
                    return Some((Err(error.into()), self));
                }
            }
        }
    }
}

#[async_trait]
impl<C: Connector> QueueProvider for BrokerQueueProvider<C> {
    type Entry = BrokerQueueEntry<C>;

    async fn consume(
        &self,
        queue: &QueueDescriptor,
        consumer: &str,
        prefetch: usize,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        self.manager.declare(queue).await?;

        let consumption = Consumption {
            manager: self.manager.clone(),
            queue: queue.clone(),
            consumer: consumer.to_owned(),
            prefetch: prefetch.max(1),
            block: self.block,
            claim_idle: self.claim_idle,
            last_claim: None,
            channel: None,
            cursor: ReadCursor::pending_head(),
            buffer: VecDeque::new(),
        };

        Ok(stream::unfold(consumption, Consumption::next).boxed())
    }
}

/// Unsettled delivery received through a [`BrokerQueueProvider`]
pub struct BrokerQueueEntry<C: Connector> {
    manager: ConnectionManager<C>,
    queue: QueueDescriptor,
    delivery: RawDelivery,
    requeued: bool,
    settled: bool,
}

impl<C: Connector> BrokerQueueEntry<C> {
    async fn settle(&mut self, requeue: bool) -> EmptyResult {
        if self.settled {
            return Ok(());
        }

        let queue = &self.queue;
        let delivery = &self.delivery;

        if requeue && !self.requeued {
            self.manager
                .with_connection(move |mut connection| async move {
                    connection
                        .push(queue, &delivery.payload, delivery.attempt + 1)
                        .await
                })
                .await?;

            self.requeued = true;
        }

        self.manager
            .with_connection(move |mut connection| async move {
                connection.ack(queue.key(), &delivery.id).await
            })
            .await?;

        self.settled = true;
        Ok(())
    }
}

#[async_trait]
impl<C: Connector> RawQueueEntry for BrokerQueueEntry<C> {
    fn payload(&self) -> &[u8] {
        &self.delivery.payload
    }

    fn attempt(&self) -> u32 {
        self.delivery.attempt
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        self.settle(false).await
    }

    async fn reject(&mut self, requeue: bool) -> EmptyResult {
        self.settle(requeue).await
    }
}

impl<C: Connector> JsonQueueEntry for BrokerQueueEntry<C> {}
