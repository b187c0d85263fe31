//! Presentation tier offering the synchronous HTTP interface
//!
//! Every HTTP request becomes a broker request to the business tier. The handling task waits
//! for the reply, which the [`CompletionService`] receives on the reply queue and hands over
//! through the shared [`ResponseRegistry`].

mod completion;
mod gateway;
mod options;
mod server;

use crate::domain::{bll_request_queue, ui_response_queue};
use crate::harness::{Heart, JobScheduler, Module, ServiceRunner};
use crate::library::communication::event::RejectPolicy;
use crate::library::communication::request::{ResponseRegistry, Requestor};
use crate::library::communication::CommunicationFactory;
use crate::library::BoxedError;
use async_trait::async_trait;
use std::sync::Arc;

pub use completion::CompletionService;
pub use gateway::{analysis_action, normalize_city, routes, Answer, Failure, Gateway};
pub use options::Options;
pub use server::ServerJob;

/// Module implementation
pub struct Presentation {
    options: Options,
}

impl Presentation {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Presentation {
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let factory = self.options.broker.connect()?;
        let registry = ResponseRegistry::new(self.options.pending_request_limit);

        let consumer = self.options.queueing.consumer();
        let replies =
            self.options
                .queueing
                .subscribe(&consumer, ui_response_queue(), RejectPolicy::Discard);
        let completion = ServiceRunner::<_, CompletionService<_>>::new(
            factory.clone(),
            replies,
            registry.clone(),
        );

        let requestor = Requestor::new(factory.publisher(), registry, bll_request_queue());
        let gateway = Arc::new(Gateway::new(requestor));

        scheduler.spawn_job(completion);
        scheduler.spawn_job(ServerJob::new(self.options.port, gateway));

        Ok(Some(Heart::without_heart_stone()))
    }
}
