use super::{Envelope, RequestRouter};
use crate::library::communication::event::{Consumer, Outcome, Publisher, QueueDescriptor};
use async_trait::async_trait;
use tracing::{debug, trace};

/// Consumer which serves requests through a [`RequestRouter`] and publishes the replies
///
/// Since the router reports every processing fault as a failed reply, the only retryable
/// outcome is a reply that could not be published.
pub struct Responder<P: Publisher> {
    router: RequestRouter,
    publisher: P,
    reply_queue: QueueDescriptor,
}

impl<P: Publisher> Responder<P> {
    /// Creates a new instance replying to the given queue
    pub fn new(router: RequestRouter, publisher: P, reply_queue: QueueDescriptor) -> Self {
        Self {
            router,
            publisher,
            reply_queue,
        }
    }
}

#[async_trait]
impl<P: Publisher + Send + Sync> Consumer for Responder<P> {
    type Message = Envelope;

    async fn consume(&self, request: Self::Message) -> Outcome {
        trace!(request_id = %request.request_id, action = %request.action, "Serving request");

        let reply = self.router.dispatch(request).await;

        debug!(
            request_id = %reply.request_id,
            action = %reply.action,
            status = ?reply.status,
            "Replying"
        );

        match self.publisher.publish(&self.reply_queue, &reply).await {
            Ok(()) => Outcome::Terminal,
            Err(e) => Outcome::Retryable(e),
        }
    }
}
