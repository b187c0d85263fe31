//! Data tier answering store queries from an SQL database

mod options;
mod repository;
mod service;

use crate::domain::dal_request_queue;
use crate::harness::{Heart, JobScheduler, Module, ServiceRunner};
use crate::library::communication::event::RejectPolicy;
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use options::Options;
pub use repository::{RepositoryError, SqliteStoreRepository, StoreRepository};
pub use service::{router, SharedRepository, StoreQueryService};

/// Module implementation
pub struct Data {
    options: Options,
    repository: Option<SharedRepository>,
}

impl Data {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self {
            options,
            repository: None,
        }
    }
}

#[async_trait]
impl Module for Data {
    async fn pre_startup(&mut self) -> EmptyResult {
        let repository = SqliteStoreRepository::connect(&self.options.database).await?;
        repository.migrate().await?;

        info!("Database is ready");
        let repository: SharedRepository = Arc::new(repository);
        self.repository = Some(repository);

        Ok(())
    }

    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let repository = match &self.repository {
            Some(repository) => repository.clone(),
            None => return Err("database has not been opened".into()),
        };

        let factory = self.options.broker.connect()?;
        let consumer = self.options.queueing.consumer();
        let subscription =
            self.options
                .queueing
                .subscribe(&consumer, dal_request_queue(), RejectPolicy::Requeue);

        let runner =
            ServiceRunner::<_, StoreQueryService<_>>::new(factory, subscription, repository);
        scheduler.spawn_job(runner);

        Ok(Some(Heart::without_heart_stone()))
    }
}
