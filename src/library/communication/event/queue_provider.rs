use super::{QueueDescriptor, QueueEntry};
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Allows consumption of durable queues
#[async_trait]
pub trait QueueProvider {
    /// Type of [`QueueEntry`] returned by the provider
    type Entry: QueueEntry + Send + Sync;

    /// Declares the queue if it does not exist and subscribes to it as the named consumer.
    ///
    /// At most `prefetch` entries are fetched from the broker at once. The returned stream is
    /// expected to outlive connection failures by resuming with the same consumer identity.
    async fn consume(
        &self,
        queue: &QueueDescriptor,
        consumer: &str,
        prefetch: usize,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError>;
}
