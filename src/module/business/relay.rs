use crate::library::communication::event::{Consumer, Outcome, Publisher, QueueDescriptor};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{trace, warn};

/// Consumer relaying requests to the data tier without touching them
///
/// Only documents that look like a request are relayed. Anything else could never be answered
/// and is dropped. Numeric request ids are the one exception to relaying verbatim, they are
/// converted to their decimal string since every other tier expects a string.
pub struct RequestRelay<P> {
    publisher: P,
    target: QueueDescriptor,
}

impl<P> RequestRelay<P> {
    /// Creates a new instance relaying into the given queue
    pub fn new(publisher: P, target: QueueDescriptor) -> Self {
        Self { publisher, target }
    }
}

fn correlation(document: &mut Value) -> Option<(String, String)> {
    let object = document.as_object_mut()?;
    let action = object.get("action")?.as_str()?.to_owned();

    let request_id = match object.get("requestId")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => {
            let id = id.to_string();
            object.insert("requestId".into(), Value::String(id.clone()));
            id
        }
        _ => return None,
    };

    Some((request_id, action))
}

#[async_trait]
impl<P: Publisher + Send + Sync> Consumer for RequestRelay<P> {
    type Message = Value;

    async fn consume(&self, mut request: Self::Message) -> Outcome {
        match correlation(&mut request) {
            Some((request_id, action)) => {
                trace!(%request_id, %action, queue = self.target.key(), "Relaying request")
            }
            None => {
                warn!(%request, "Dropping request without requestId or action");
                return Outcome::Terminal;
            }
        }

        match self.publisher.publish(&self.target, &request).await {
            Ok(()) => Outcome::Terminal,
            Err(e) => Outcome::Retryable(e),
        }
    }
}
