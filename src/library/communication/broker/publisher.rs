use super::{BrokerConnection, ConnectionManager, Connector};
use crate::library::communication::event::{QueueDescriptor, RawPublisher};
use crate::library::communication::implementation::json::JsonPublisher;
use crate::library::EmptyResult;
use async_trait::async_trait;

/// [`RawPublisher`] implementation on top of a [`ConnectionManager`]
///
/// Publishing waits for an ongoing recovery to finish. A publish that fails because the
/// connection dropped is repeated once on the replacement connection, so a message may be
/// delivered twice. Callers are expected to bound publishing with a timeout.
pub struct BrokerPublisher<C: Connector> {
    manager: ConnectionManager<C>,
}

impl<C: Connector> BrokerPublisher<C> {
    /// Creates a new instance publishing through the given manager
    pub fn new(manager: ConnectionManager<C>) -> Self {
        Self { manager }
    }
}

impl<C: Connector> Clone for BrokerPublisher<C> {
    fn clone(&self) -> Self {
        Self::new(self.manager.clone())
    }
}

impl<C: Connector> JsonPublisher for BrokerPublisher<C> {}

#[async_trait]
impl<C: Connector> RawPublisher for BrokerPublisher<C> {
    async fn publish_raw(&self, data: &[u8], queue: &QueueDescriptor) -> EmptyResult {
        self.manager
            .with_connection(move |mut connection| async move {
                connection.push(queue, data, 1).await
            })
            .await?;

        Ok(())
    }
}
