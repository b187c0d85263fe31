use super::gateway::{routes, Gateway};
use crate::harness::Job;
use crate::library::communication::event::Publisher;
use crate::library::EmptyResult;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Job serving the HTTP routes of a [`Gateway`]
pub struct ServerJob<P: Publisher> {
    port: u16,
    gateway: Arc<Gateway<P>>,
}

impl<P: Publisher> ServerJob<P> {
    /// Creates a new instance listening on all interfaces
    pub fn new(port: u16, gateway: Arc<Gateway<P>>) -> Self {
        Self { port, gateway }
    }
}

#[async_trait]
impl<P> Job for ServerJob<P>
where
    P: Publisher + Send + Sync + 'static,
{
    const NAME: &'static str = module_path!();

    async fn execute(&self) -> EmptyResult {
        let source_addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let (addr, server) =
            warp::serve(routes(self.gateway.clone())).try_bind_ephemeral(source_addr)?;

        info!(?addr, "Serving gateway");
        server.await;

        Ok(())
    }
}
