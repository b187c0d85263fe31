use crate::harness::Service;
use crate::library::communication::request::{Envelope, ResponseCompleter, ResponseRegistry};
use crate::library::communication::CommunicationFactory;
use std::marker::PhantomData;

/// Hands replies arriving from the business tier to the callers waiting for them
pub struct CompletionService<F> {
    phantom: PhantomData<F>,
}

impl<F> Service<F> for CompletionService<F>
where
    F: CommunicationFactory,
{
    const NAME: &'static str = "CompletionService";
    type Instance = ResponseCompleter;
    type Config = ResponseRegistry<Envelope>;

    fn instantiate(_factory: F, registry: &Self::Config) -> Self::Instance {
        ResponseCompleter::new(registry.clone())
    }
}
