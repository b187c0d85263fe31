use super::PostProcessors;
use crate::library::communication::event::{Consumer, Outcome, Publisher, QueueDescriptor};
use crate::library::communication::request::Envelope;
use crate::library::communication::BlackboxError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Consumer reshaping replies of the data tier before handing them to the caller
///
/// Successful replies are transformed by the post-processing strategy registered for their
/// action. Failed replies are passed on untouched. A failing strategy turns the reply into a
/// failed one instead of rejecting the delivery.
pub struct ResponseShaper<P> {
    publisher: P,
    processors: PostProcessors,
    reply_queue: QueueDescriptor,
}

impl<P> ResponseShaper<P> {
    /// Creates a new instance publishing reshaped replies to the given queue
    pub fn new(publisher: P, processors: PostProcessors, reply_queue: QueueDescriptor) -> Self {
        Self {
            publisher,
            processors,
            reply_queue,
        }
    }

    fn shape(&self, mut reply: Envelope) -> Envelope {
        reply.params = None;

        if !reply.is_success() || !self.processors.transforms(&reply.action) {
            return reply;
        }

        let data = reply.data.take().unwrap_or(Value::Null);

        match self.processors.apply(&reply.action, data) {
            Ok(data) => {
                reply.data = Some(data);
                reply
            }
            Err(error) => {
                let error = BlackboxError::new(error);
                warn!(request_id = %reply.request_id, action = %reply.action, %error, "Post-processing failed");
                reply.fail(error.to_string())
            }
        }
    }
}

#[async_trait]
impl<P: Publisher + Send + Sync> Consumer for ResponseShaper<P> {
    type Message = Envelope;

    async fn consume(&self, reply: Self::Message) -> Outcome {
        let reply = self.shape(reply);

        debug!(
            request_id = %reply.request_id,
            action = %reply.action,
            status = ?reply.status,
            "Returning reply"
        );

        match self.publisher.publish(&self.reply_queue, &reply).await {
            Ok(()) => Outcome::Terminal,
            Err(e) => Outcome::Retryable(e),
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::domain::analysis::{AnalysisError, Row};
    use crate::domain::{BUSINESS_HOURS_ANALYSIS, GEOGRAPHIC_DISPERSION};
    use crate::library::communication::implementation::mock::MockPublisher;
    use crate::library::communication::request::Status;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn explode(_: &[Row]) -> Result<Value, AnalysisError> {
        panic!("boom")
    }

    fn shaper(publisher: &MockPublisher, processors: PostProcessors) -> ResponseShaper<MockPublisher> {
        ResponseShaper::new(publisher.clone(), processors, QueueDescriptor::named("replies"))
    }

    async fn reshape(processors: PostProcessors, reply: Envelope) -> Envelope {
        let publisher = MockPublisher::default();

        let outcome = shaper(&publisher, processors).consume(reply).await;
        assert!(matches!(outcome, Outcome::Terminal));

        let mut replies = publisher.published_to::<Envelope>("replies");
        assert_eq!(replies.len(), 1);
        replies.remove(0)
    }

    #[tokio::test]
    async fn pass_replies_without_strategy_through() {
        let rows = json!([{"city": "Beijing"}, {"city": "Shanghai"}]);
        let request = Envelope::request("r-1", "get_store_by_city", None);

        let reply = reshape(PostProcessors::default(), request.succeed(rows.clone())).await;

        assert_eq!(reply, request.succeed(rows));
    }

    #[tokio::test]
    async fn transform_successful_replies() {
        let rows = json!([
            {"latitude": "30.0", "longitude": "110.0"},
            {"latitude": "32.0", "longitude": "120.0"},
        ]);
        let request = Envelope::request("r-2", GEOGRAPHIC_DISPERSION, None);

        let reply = reshape(PostProcessors::default(), request.succeed(rows)).await;

        assert_eq!(reply.status, Some(Status::Success));
        assert_eq!(reply.request_id, "r-2");
        assert_eq!(reply.action, GEOGRAPHIC_DISPERSION);
        assert_eq!(reply.data.unwrap()["center"], json!({"lat": 31.0, "lng": 115.0}));
    }

    #[tokio::test]
    async fn keep_failed_replies_intact() {
        let request = Envelope::request("r-3", BUSINESS_HOURS_ANALYSIS, None);
        let failure = request.fail("no such table: starbucks_store");

        let reply = reshape(PostProcessors::default(), failure.clone()).await;

        assert_eq!(reply, failure);
    }

    #[tokio::test]
    async fn fail_replies_the_strategy_can_not_handle() {
        let request = Envelope::request("r-4", BUSINESS_HOURS_ANALYSIS, None);

        let reply = reshape(PostProcessors::default(), request.succeed(json!({"rows": 0}))).await;

        assert_eq!(reply.status, Some(Status::Fail));
        assert!(reply
            .msg
            .as_deref()
            .unwrap_or_default()
            .starts_with("expected a list of records"));
        assert_eq!(reply.data, None);
    }

    #[tokio::test]
    async fn fail_replies_whose_strategy_panics() {
        let processors = PostProcessors::empty().register("explode", explode);
        let request = Envelope::request("r-5", "explode", None);

        let reply = reshape(processors, request.succeed(json!([]))).await;

        assert_eq!(reply, request.fail("post-processing panicked: boom"));
    }

    #[tokio::test]
    async fn requeue_replies_that_could_not_be_published() {
        let publisher = MockPublisher::default();
        publisher.fail(true);
        let request = Envelope::request("r-6", "get_store_by_city", None);

        let outcome = shaper(&publisher, PostProcessors::default())
            .consume(request.succeed(json!([])))
            .await;

        assert!(matches!(outcome, Outcome::Retryable(_)));
    }
}
