use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use serde::Deserialize;

/// Describes a durable queue
///
/// Queues are never capped in length. Messages only leave a queue once they have been settled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueDescriptor {
    key: String,
}

impl QueueDescriptor {
    /// Creates a new instance for the queue with the given name
    pub fn named(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Literal name of the queue on the broker
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Entry retrieved from a [`Queue`](QueueDescriptor) providing a raw payload
///
/// Every entry has to be settled exactly once, either by [acknowledging](RawQueueEntry::acknowledge)
/// or by [rejecting](RawQueueEntry::reject) it. Unsettled entries are redelivered once the
/// consumer reconnects.
#[async_trait]
pub trait RawQueueEntry {
    /// Payload of the item
    fn payload(&self) -> &[u8];

    /// How often this message has been delivered, starting at one
    fn attempt(&self) -> u32;

    /// Acknowledge the item as processed, removing it from the queue permanently
    async fn acknowledge(&mut self) -> EmptyResult;

    /// Reject the item, either returning it to the queue for redelivery or dropping it
    async fn reject(&mut self, requeue: bool) -> EmptyResult;
}

/// Useful functions for [`QueueEntry`] implementations with default implementations
pub trait QueueEntry: RawQueueEntry {
    /// Attempts to parse the wire-format payload into a given data structure
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>;
}
