use super::{Envelope, Params, RegistryError, ResponseRegistry, WaitError};
use crate::library::communication::event::{Consumer, Outcome, Publisher, QueueDescriptor};
use crate::library::BoxedError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout, Instant};
use tracing::{debug, instrument, trace};
use uuid::Uuid;

/// Error type for sending requests
#[derive(Error, Debug)]
pub enum RequestError {
    /// No reply arrived before the deadline
    #[error("request {request_id} timed out")]
    TimedOut {
        /// Id of the abandoned request
        request_id: String,
    },
    /// Publishing of the request failed
    #[error("sending of request failed")]
    SendingFailure(#[source] BoxedError),
    /// The request could not be registered for a reply
    #[error("unable to register request")]
    Registration(#[from] RegistryError),
}

/// Issues requests and waits for their replies
///
/// Replies are expected to be fed into the registry by a [`ResponseCompleter`] consuming the
/// queue on which the serving side publishes its replies.
pub struct Requestor<P: Publisher> {
    publisher: P,
    registry: ResponseRegistry<Envelope>,
    queue: QueueDescriptor,
}

impl<P: Publisher + Send + Sync> Requestor<P> {
    /// Creates a new instance which sends requests to the given queue
    pub fn new(publisher: P, registry: ResponseRegistry<Envelope>, queue: QueueDescriptor) -> Self {
        Self {
            publisher,
            registry,
            queue,
        }
    }

    /// Sends a request and waits for its reply
    ///
    /// The timeout covers both publishing and waiting, so an unreachable broker yields
    /// [`RequestError::TimedOut`] rather than blocking the caller.
    #[instrument(skip(self, params), fields(queue = self.queue.key()))]
    pub async fn call(
        &self,
        action: &str,
        params: Option<Params>,
        duration: Duration,
    ) -> Result<Envelope, RequestError> {
        let deadline = Instant::now() + duration;
        let request_id = Uuid::new_v4().to_string();
        let request = Envelope::request(request_id.clone(), action, params);

        // Registering first guarantees that no reply can arrive before anyone waits for it
        let handle = self.registry.register(request_id.clone())?;

        match timeout(duration, self.publisher.publish(&self.queue, &request)).await {
            Ok(Ok(())) => trace!(request_id = %request_id, "Published request"),
            Ok(Err(e)) => return Err(RequestError::SendingFailure(e)),
            Err(_) => return Err(RequestError::TimedOut { request_id }),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());

        handle.wait(remaining).await.map_err(|_: WaitError| {
            debug!(request_id = %request_id, "Abandoning request");
            RequestError::TimedOut {
                request_id: request_id.clone(),
            }
        })
    }
}

/// Consumer which hands incoming replies to the callers waiting for them
pub struct ResponseCompleter {
    registry: ResponseRegistry<Envelope>,
}

impl ResponseCompleter {
    /// Creates a new instance completing requests in the given registry
    pub fn new(registry: ResponseRegistry<Envelope>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Consumer for ResponseCompleter {
    type Message = Envelope;

    async fn consume(&self, reply: Self::Message) -> Outcome {
        if !self.registry.complete(&reply.request_id, reply.clone()) {
            debug!(request_id = %reply.request_id, action = %reply.action, "Dropping reply nobody waits for");
        }

        Outcome::Terminal
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::library::communication::event::{ConsumerExt, RejectPolicy, Settlement};
    use crate::library::communication::implementation::mock::{MockPublisher, MockQueueEntry};
    use crate::library::communication::request::Status;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const QUEUE: &str = "requests";

    #[tokio::test]
    async fn resolve_calls_with_replies() {
        let publisher = MockPublisher::default();
        let registry = ResponseRegistry::new(10);
        let requestor = Requestor::new(
            publisher.clone(),
            registry.clone(),
            QueueDescriptor::named(QUEUE),
        );
        let completer = ResponseCompleter::new(registry.clone());

        let call = tokio::spawn(async move {
            requestor
                .call("ping", None, Duration::from_secs(5))
                .await
        });

        // Answer the request once it shows up
        let request = loop {
            if let Some(request) = publisher.published_to::<Envelope>(QUEUE).pop() {
                break request;
            }
            tokio::task::yield_now().await;
        };

        let reply = request.succeed(json!("pong"));
        let payload = serde_json::to_vec(&reply).unwrap();
        let settlement = completer
            .dispatch(MockQueueEntry::new(&payload), RejectPolicy::Discard)
            .await;

        let response = call.await.unwrap().unwrap();
        assert_eq!(settlement, Settlement::Acknowledged);
        assert_eq!(response.status, Some(Status::Success));
        assert_eq!(response.data, Some(json!("pong")));
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn time_out_unanswered_calls() {
        let publisher = MockPublisher::default();
        let registry = ResponseRegistry::new(10);
        let requestor = Requestor::new(publisher.clone(), registry.clone(), QueueDescriptor::named(QUEUE));

        let result = requestor.call("ping", None, Duration::from_millis(10)).await;

        let request = publisher.published_to::<Envelope>(QUEUE).pop().unwrap();
        match result {
            Err(RequestError::TimedOut { request_id }) => assert_eq!(request_id, request.request_id),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn report_publishing_failures() {
        let publisher = MockPublisher::default();
        publisher.fail(true);
        let registry = ResponseRegistry::new(10);
        let requestor = Requestor::new(publisher, registry.clone(), QueueDescriptor::named(QUEUE));

        let result = requestor.call("ping", None, Duration::from_secs(1)).await;

        assert!(matches!(result, Err(RequestError::SendingFailure(_))));
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn drop_replies_nobody_waits_for() {
        let registry = ResponseRegistry::new(10);
        let completer = ResponseCompleter::new(registry);
        let reply = Envelope::request("unknown", "ping", None).fail("late");
        let payload = serde_json::to_vec(&reply).unwrap();

        let settlement = completer
            .dispatch(MockQueueEntry::new(&payload), RejectPolicy::Discard)
            .await;

        assert_eq!(settlement, Settlement::Acknowledged);
    }
}
