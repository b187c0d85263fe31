use crate::library::communication::event::{Publisher, QueueProvider};

/// Factory to provide implementations for the traits from this module
pub trait CommunicationFactory {
    /// [`QueueProvider`] implementation type
    type QueueProvider: QueueProvider + Send + Sync;
    /// [`Publisher`] implementation type
    type Publisher: Publisher + Send + Sync;

    /// Instantiates a new [`QueueProvider`]
    fn queue_provider(&self) -> Self::QueueProvider;
    /// Instantiates a new [`Publisher`]
    fn publisher(&self) -> Self::Publisher;
}
