use super::QueueDescriptor;
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde::Serialize;

/// Structure which allows publishing of serialized data into a queue
#[async_trait]
pub trait RawPublisher {
    /// Sends an opaque, persistent payload to a [`Queue`](QueueDescriptor)
    ///
    /// Returning `Ok(())` means the payload has been written to the broker connection.
    /// It does not guarantee receipt by the broker if the connection drops mid-write.
    async fn publish_raw(&self, data: &[u8], queue: &QueueDescriptor) -> EmptyResult;
}

/// Publisher for arbitrary serializable messages
#[async_trait]
pub trait Publisher {
    /// Serializes the message and publishes it to the given queue
    async fn publish<M: Serialize + Send + Sync>(
        &self,
        queue: &QueueDescriptor,
        message: &M,
    ) -> EmptyResult;
}
