//! One-shot client issuing a single request to the business tier
//!
//! The reply is printed to standard output. Since this client competes with any running
//! presentation tier for the replies on the shared reply queue, it is meant for diagnostics
//! while no gateway is running.

mod options;

use crate::domain::{bll_request_queue, ui_response_queue};
use crate::harness::{Heart, JobScheduler, Module, ServiceRunner};
use crate::library::communication::event::{RejectPolicy, Subscription};
use crate::library::communication::request::{Params, Requestor, ResponseRegistry};
use crate::library::communication::CommunicationFactory;
use crate::library::BoxedError;
use crate::module::presentation::CompletionService;
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

pub use options::Options;

/// Module implementation
pub struct Call {
    options: Options,
}

impl Call {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    fn params(&self) -> Result<Option<Params>, BoxedError> {
        match &self.options.params {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Module for Call {
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let params = self.params()?;
        let factory = self.options.broker.connect()?;
        let registry = ResponseRegistry::new(1);

        let consumer = format!("call-{}", Uuid::new_v4());
        let replies = Subscription::new(ui_response_queue(), consumer, RejectPolicy::Discard);
        scheduler.spawn_job(ServiceRunner::<_, CompletionService<_>>::new(
            factory.clone(),
            replies,
            registry.clone(),
        ));

        let requestor = Requestor::new(factory.publisher(), registry, bll_request_queue());
        let reply = requestor
            .call(&self.options.action, params, self.options.timeout)
            .await?;

        debug!(request_id = %reply.request_id, status = ?reply.status, "Received reply");
        println!("{}", serde_json::to_string_pretty(&reply)?);

        Ok(None)
    }
}
