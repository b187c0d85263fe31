use super::{QueueDescriptor, QueueEntry, QueueProvider};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::any::type_name;
use tracing::{debug, trace, warn};

const DEFAULT_PREFETCH: usize = 1;

/// Result of processing a single message
///
/// The dispatcher derives the settlement of the delivery from this value
/// instead of guessing from whether processing happened to fail.
#[derive(Debug)]
pub enum Outcome {
    /// Processing concluded, whether successfully or with a failure that has been reported
    /// back to the requester. The delivery is acknowledged.
    Terminal,
    /// Processing could not conclude due to an unexpected fault. The delivery is rejected
    /// according to the [`RejectPolicy`] of the subscription.
    Retryable(BoxedError),
}

impl Outcome {
    /// Convenience constructor for [`Outcome::Retryable`]
    pub fn retry(reason: impl Into<BoxedError>) -> Self {
        Self::Retryable(reason.into())
    }
}

/// What happens to a delivery whose processing yields [`Outcome::Retryable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectPolicy {
    /// Return the message to the queue for redelivery.
    ///
    /// A message which deterministically fails is redelivered indefinitely (poison message).
    /// There is no dead-letter routing nor a retry cap.
    Requeue,
    /// Drop the message, it will never be redelivered
    Discard,
}

/// How a delivery has been settled with the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Processed and removed from the queue
    Acknowledged,
    /// Returned to the queue for redelivery
    Requeued,
    /// Dropped after a retryable failure
    Discarded,
    /// Dropped because the payload could not be decoded
    Malformed,
}

/// Binding of a [`Consumer`] to a queue
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Queue to consume
    pub queue: QueueDescriptor,
    /// Stable identity of the consumer on the broker
    pub consumer: String,
    /// Maximum number of unsettled deliveries held and processed concurrently
    pub prefetch: usize,
    /// Settlement of deliveries that could not be processed
    pub policy: RejectPolicy,
}

impl Subscription {
    /// Creates a new subscription with a prefetch of one
    pub fn new(queue: QueueDescriptor, consumer: impl Into<String>, policy: RejectPolicy) -> Self {
        Self {
            queue,
            consumer: consumer.into(),
            prefetch: DEFAULT_PREFETCH,
            policy,
        }
    }

    /// Overrides the prefetch limit, values below one are raised to one
    pub fn with_prefetch(mut self, prefetch: usize) -> Self {
        self.prefetch = prefetch.max(1);
        self
    }
}

/// Entity which may consume and process messages from a queue
#[async_trait]
pub trait Consumer {
    /// Message type the queue carries
    type Message: DeserializeOwned + Send;

    /// Processes a message and returns how the delivery should be settled
    async fn consume(&self, message: Self::Message) -> Outcome;
}

/// Helper functions to aid the consumption of messages
#[async_trait]
pub trait ConsumerExt {
    /// Consumes messages from the subscribed queue using the given provider and settles
    /// each delivery according to the outcome of processing it.
    ///
    /// At most `subscription.prefetch` messages are processed concurrently.
    async fn consume_queue<Q>(&self, provider: &Q, subscription: &Subscription) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync;

    /// Decodes, processes and settles a single delivery
    async fn dispatch<E>(&self, entry: E, policy: RejectPolicy) -> Settlement
    where
        E: QueueEntry + Send + Sync;
}

#[async_trait]
impl<C> ConsumerExt for C
where
    C: Consumer + Send + Sync,
    C::Message: Send + Sync,
{
    async fn consume_queue<Q>(&self, provider: &Q, subscription: &Subscription) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync,
    {
        let stream = provider
            .consume(
                &subscription.queue,
                &subscription.consumer,
                subscription.prefetch,
            )
            .await?;

        debug!(
            queue = subscription.queue.key(),
            consumer = %subscription.consumer,
            prefetch = subscription.prefetch,
            "Consuming queue"
        );

        let policy = subscription.policy;
        stream
            .for_each_concurrent(Some(subscription.prefetch), |item| async move {
                match item {
                    Ok(entry) => {
                        self.dispatch(entry, policy).await;
                    }
                    Err(error) => warn!(
                        ?error,
                        "Failed to receive {}",
                        type_name::<C::Message>()
                    ),
                }
            })
            .await;

        Ok(())
    }

    async fn dispatch<E>(&self, mut entry: E, policy: RejectPolicy) -> Settlement
    where
        E: QueueEntry + Send + Sync,
    {
        let message = match entry.parse_payload::<C::Message>() {
            Ok(message) => message,
            Err(error) => {
                // A payload that can not be decoded never will be, redelivering it would loop forever
                warn!(?error, "Dropping undecodable {}", type_name::<C::Message>());
                if let Err(error) = entry.acknowledge().await {
                    warn!(?error, "Failed to drop undecodable message");
                }
                return Settlement::Malformed;
            }
        };

        match self.consume(message).await {
            Outcome::Terminal => {
                if let Err(error) = entry.acknowledge().await {
                    warn!(?error, "Failed to acknowledge {}", type_name::<C::Message>());
                }
                trace!(attempt = entry.attempt(), "Acknowledged delivery");
                Settlement::Acknowledged
            }
            Outcome::Retryable(reason) => {
                let requeue = policy == RejectPolicy::Requeue;

                warn!(
                    ?reason,
                    requeue,
                    attempt = entry.attempt(),
                    "Failed to consume {}",
                    type_name::<C::Message>()
                );

                if let Err(error) = entry.reject(requeue).await {
                    warn!(?error, "Failed to reject {}", type_name::<C::Message>());
                }

                if requeue {
                    Settlement::Requeued
                } else {
                    Settlement::Discarded
                }
            }
        }
    }
}
