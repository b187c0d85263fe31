use super::Job;
use crate::library::communication::event::{ConsumerExt, Subscription};
use crate::library::communication::CommunicationFactory;
use crate::library::EmptyResult;
use async_trait::async_trait;

/// Structure which can be instantiated with a [`CommunicationFactory`]
pub trait Service<F: CommunicationFactory> {
    /// Name of the service displayed in log messages
    const NAME: &'static str;
    /// Instance type which will be instantiated
    type Instance: Send + Sync;
    /// Configuration type passed to the service
    type Config: Send + Sync;

    /// Creates a new instance which could be of a different type.
    /// This is common when a service only provides the handlers for a
    /// [`Responder`](crate::library::communication::request::Responder) which then
    /// becomes the actual instance.
    fn instantiate(factory: F, config: &Self::Config) -> Self::Instance;
}

/// Job consuming a [`Subscription`] with a [`Service`] whose instance is a consumer
pub struct ServiceRunner<F, S>
where
    F: CommunicationFactory,
    S: Service<F>,
{
    factory: F,
    subscription: Subscription,
    config: S::Config,
}

impl<F, S> ServiceRunner<F, S>
where
    F: CommunicationFactory,
    S: Service<F>,
    S::Instance: ConsumerExt,
{
    /// Creates a new runner job which consumes the subscription using implementations provided by the factory
    pub fn new(factory: F, subscription: Subscription, config: S::Config) -> Self {
        Self {
            factory,
            subscription,
            config,
        }
    }
}

#[async_trait]
impl<F, S> Job for ServiceRunner<F, S>
where
    F: CommunicationFactory + Clone + Send + Sync,
    S: Service<F> + Send + Sync,
    S::Instance: ConsumerExt,
{
    const NAME: &'static str = "ServiceRunner";

    fn name(&self) -> String {
        format!("{}({})", Self::NAME, S::NAME)
    }

    async fn execute(&self) -> EmptyResult {
        let provider = self.factory.queue_provider();
        let service = S::instantiate(self.factory.clone(), &self.config);

        service.consume_queue(&provider, &self.subscription).await
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::library::communication::event::{
        Consumer, Outcome, Publisher, QueueDescriptor, RejectPolicy, Settlement,
    };
    use crate::library::communication::implementation::mock::{
        MockCommunicationFactory, MockPublisher,
    };
    use serde_json::Value;

    struct Echo<P> {
        publisher: P,
    }

    #[async_trait]
    impl<P: Publisher + Send + Sync> Consumer for Echo<P> {
        type Message = Value;

        async fn consume(&self, message: Value) -> Outcome {
            match self
                .publisher
                .publish(&QueueDescriptor::named("echoes"), &message)
                .await
            {
                Ok(()) => Outcome::Terminal,
                Err(e) => Outcome::Retryable(e),
            }
        }
    }

    impl<F: CommunicationFactory> Service<F> for Echo<F::Publisher> {
        const NAME: &'static str = "Echo";
        type Instance = Self;
        type Config = ();

        fn instantiate(factory: F, _: &()) -> Self {
            Self {
                publisher: factory.publisher(),
            }
        }
    }

    #[tokio::test]
    async fn consume_subscriptions_with_instantiated_services() {
        let factory = MockCommunicationFactory::default();
        factory.queue_provider.feed(br#"{"hello":"world"}"#);
        factory.queue_provider.feed(b"not json");
        factory.queue_provider.close();

        let subscription = Subscription::new(
            QueueDescriptor::named("greetings"),
            "tester",
            RejectPolicy::Requeue,
        );
        let runner: ServiceRunner<MockCommunicationFactory, Echo<MockPublisher>> =
            ServiceRunner::new(factory.clone(), subscription, ());

        assert_eq!(runner.name(), "ServiceRunner(Echo)");
        runner.execute().await.unwrap();

        assert_eq!(
            factory.publisher.published_to::<Value>("echoes"),
            vec![serde_json::json!({"hello": "world"})]
        );
        assert_eq!(
            factory.queue_provider.log().settlements(),
            vec![Settlement::Acknowledged, Settlement::Acknowledged]
        );
    }
}
