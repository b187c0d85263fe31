use super::{MockPublisher, MockQueueProvider};
use crate::library::communication::CommunicationFactory;

/// Factory handing out shared mock implementations
#[derive(Clone, Default)]
pub struct MockCommunicationFactory {
    pub publisher: MockPublisher,
    pub queue_provider: MockQueueProvider,
}

impl CommunicationFactory for MockCommunicationFactory {
    type QueueProvider = MockQueueProvider;
    type Publisher = MockPublisher;

    fn queue_provider(&self) -> Self::QueueProvider {
        self.queue_provider.clone()
    }

    fn publisher(&self) -> Self::Publisher {
        self.publisher.clone()
    }
}
