use super::{BrokerPublisher, BrokerQueueProvider, ConnectionManager, Connector};
use crate::library::communication::CommunicationFactory;
use std::time::Duration;

/// [`CommunicationFactory`] handing out implementations that share one [`ConnectionManager`]
pub struct BrokerCommunicationFactory<C: Connector> {
    manager: ConnectionManager<C>,
    claim_idle: Option<Duration>,
}

impl<C: Connector> BrokerCommunicationFactory<C> {
    /// Creates a new factory from a manager
    pub fn new(manager: ConnectionManager<C>) -> Self {
        Self {
            manager,
            claim_idle: None,
        }
    }

    /// Overrides the claim idle time of all queue providers handed out
    pub fn with_claim_idle(mut self, claim_idle: Duration) -> Self {
        self.claim_idle = Some(claim_idle);
        self
    }

    /// Manager shared by all implementations handed out
    pub fn manager(&self) -> &ConnectionManager<C> {
        &self.manager
    }
}

impl<C: Connector> Clone for BrokerCommunicationFactory<C> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            claim_idle: self.claim_idle,
        }
    }
}

impl<C: Connector> CommunicationFactory for BrokerCommunicationFactory<C> {
    type QueueProvider = BrokerQueueProvider<C>;
    type Publisher = BrokerPublisher<C>;

    fn queue_provider(&self) -> Self::QueueProvider {
        let provider = BrokerQueueProvider::new(self.manager.clone());

        match self.claim_idle {
            Some(claim_idle) => provider.with_claim_idle(claim_idle),
            None => provider,
        }
    }

    fn publisher(&self) -> Self::Publisher {
        BrokerPublisher::new(self.manager.clone())
    }
}
