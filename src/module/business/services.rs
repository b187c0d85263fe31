use super::{PostProcessors, RequestRelay, ResponseShaper};
use crate::domain::{dal_request_queue, ui_response_queue};
use crate::harness::Service;
use crate::library::communication::CommunicationFactory;
use std::marker::PhantomData;

/// Forwards requests of the presentation tier to the data tier
pub struct RelayService<F> {
    phantom: PhantomData<F>,
}

impl<F> Service<F> for RelayService<F>
where
    F: CommunicationFactory,
{
    const NAME: &'static str = "RelayService";
    type Instance = RequestRelay<F::Publisher>;
    type Config = ();

    fn instantiate(factory: F, _config: &Self::Config) -> Self::Instance {
        RequestRelay::new(factory.publisher(), dal_request_queue())
    }
}

/// Post-processes replies of the data tier and returns them to the presentation tier
pub struct ShapingService<F> {
    phantom: PhantomData<F>,
}

impl<F> Service<F> for ShapingService<F>
where
    F: CommunicationFactory,
{
    const NAME: &'static str = "ShapingService";
    type Instance = ResponseShaper<F::Publisher>;
    type Config = PostProcessors;

    fn instantiate(factory: F, processors: &Self::Config) -> Self::Instance {
        ResponseShaper::new(factory.publisher(), processors.clone(), ui_response_queue())
    }
}
