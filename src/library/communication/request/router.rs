use super::{Envelope, Params};
use crate::library::communication::BlackboxError;
use crate::library::helpers::panic_message;
use crate::library::BoxedError;
use futures::future::BoxFuture;
use futures::{Future, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

type Handler = Box<dyn Fn(Params) -> BoxFuture<'static, Result<Value, BoxedError>> + Send + Sync>;

/// Table of handlers keyed by the action they serve
///
/// Dispatching never fails. Unknown actions, handler errors and even handler panics are turned
/// into failed replies so that a deterministic fault is reported to the caller instead of
/// being redelivered over and over.
#[derive(Default)]
pub struct RequestRouter {
    routes: HashMap<String, Handler>,
}

impl RequestRouter {
    /// Creates an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an action, replacing any previous one
    pub fn route<F, Fut>(mut self, action: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxedError>> + Send + 'static,
    {
        self.routes
            .insert(action.into(), Box::new(move |params| handler(params).boxed()));
        self
    }

    /// Actions which have a handler
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Runs the handler for the action of the request and builds the reply
    pub async fn dispatch(&self, request: Envelope) -> Envelope {
        let handler = match self.routes.get(&request.action) {
            Some(handler) => handler,
            None => {
                debug!(action = %request.action, "Rejecting unknown action");
                return request.fail(format!("unknown action: {}", request.action));
            }
        };

        let params = request.params.clone().unwrap_or_default();
        let execution = AssertUnwindSafe(async move { handler(params).await }).catch_unwind();

        match execution.await {
            Ok(Ok(data)) => request.succeed(data),
            Ok(Err(error)) => {
                let error = BlackboxError::from_boxed(&error);
                debug!(action = %request.action, %error, "Handler failed");
                request.fail(error.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(action = %request.action, message = %message, "Handler panicked");
                request.fail(format!("handler panicked: {}", message))
            }
        }
    }
}
