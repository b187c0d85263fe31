//! Business tier bridging the presentation and data tiers
//!
//! Requests are relayed verbatim to the data tier. Its replies are matched back to the caller
//! purely by the `requestId` they carry, so no state about in-flight requests is kept here.
//! On their way back, successful replies are reshaped by the [`PostProcessors`] registered
//! for their action.

mod options;
mod post_processing;
mod relay;
mod services;
mod shaper;

use crate::domain::{bll_request_queue, dal_response_queue};
use crate::harness::{Heart, JobScheduler, Module, ServiceRunner};
use crate::library::communication::event::RejectPolicy;
use crate::library::BoxedError;
use async_trait::async_trait;

pub use options::Options;
pub use post_processing::{PostProcessingError, PostProcessors};
pub use relay::RequestRelay;
pub use services::{RelayService, ShapingService};
pub use shaper::ResponseShaper;

/// Module implementation
pub struct Business {
    options: Options,
}

impl Business {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Business {
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let factory = self.options.broker.connect()?;
        let queueing = &self.options.queueing;
        let consumer = queueing.consumer();

        let requests = queueing.subscribe(&consumer, bll_request_queue(), RejectPolicy::Requeue);
        let replies = queueing.subscribe(&consumer, dal_response_queue(), RejectPolicy::Requeue);

        let relay = ServiceRunner::<_, RelayService<_>>::new(factory.clone(), requests, ());
        let shaper = ServiceRunner::<_, ShapingService<_>>::new(
            factory,
            replies,
            PostProcessors::default(),
        );

        scheduler.spawn_job(relay);
        scheduler.spawn_job(shaper);

        Ok(Some(Heart::without_heart_stone()))
    }
}
