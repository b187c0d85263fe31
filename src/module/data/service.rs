use super::repository::StoreRepository;
use crate::domain::{dal_response_queue, ANALYSIS_ACTIONS, GET_STORE_BY_CITY};
use crate::harness::Service;
use crate::library::communication::request::{Params, RequestRouter, Responder};
use crate::library::communication::CommunicationFactory;
use crate::library::BoxedError;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Repository shared by all handlers of the data tier
pub type SharedRepository = Arc<dyn StoreRepository + Send + Sync>;

#[derive(Debug, Error)]
#[error("missing parameter: {0}")]
struct MissingParameter(&'static str);

/// Serves store queries from the business tier
pub struct StoreQueryService<F> {
    phantom: PhantomData<F>,
}

impl<F> Service<F> for StoreQueryService<F>
where
    F: CommunicationFactory,
{
    const NAME: &'static str = "StoreQueryService";
    type Instance = Responder<F::Publisher>;
    type Config = SharedRepository;

    fn instantiate(factory: F, repository: &SharedRepository) -> Self::Instance {
        Responder::new(
            router(repository.clone()),
            factory.publisher(),
            dal_response_queue(),
        )
    }
}

/// Handlers for all actions served by the data tier
pub fn router(repository: SharedRepository) -> RequestRouter {
    let by_city = repository.clone();
    let mut router = RequestRouter::new().route(GET_STORE_BY_CITY, move |params| {
        stores_by_city(by_city.clone(), params)
    });

    for action in ANALYSIS_ACTIONS {
        let repository = repository.clone();
        router = router.route(action, move |_| all_stores(repository.clone()));
    }

    router
}

async fn stores_by_city(repository: SharedRepository, params: Params) -> Result<Value, BoxedError> {
    let city = params
        .get("city")
        .and_then(Value::as_str)
        .ok_or(MissingParameter("city"))?;

    let stores = repository.stores_by_city(city).await?;
    Ok(serde_json::to_value(stores)?)
}

async fn all_stores(repository: SharedRepository) -> Result<Value, BoxedError> {
    let stores = repository.all_stores().await?;
    Ok(serde_json::to_value(stores)?)
}

#[cfg(test)]
mod does {
    use super::super::repository::does::store;
    use super::super::repository::RepositoryError;
    use super::*;
    use crate::domain::{Store, EXPANSION_TREND};
    use crate::library::communication::request::{Envelope, Status};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct FixedRepository;

    #[async_trait]
    impl StoreRepository for FixedRepository {
        async fn stores_by_city(&self, city: &str) -> Result<Vec<Store>, RepositoryError> {
            Ok(vec![store("Guomao", city, None)])
        }

        async fn all_stores(&self) -> Result<Vec<Store>, RepositoryError> {
            Ok(vec![
                store("Guomao", "北京市", Some(("39.9", "116.4"))),
                store("Jing'an", "上海市", Some(("31.2", "121.4"))),
            ])
        }
    }

    fn params(value: Value) -> Option<Params> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn serve_stores_by_city() {
        let router = router(Arc::new(FixedRepository));
        let request = Envelope::request("1", GET_STORE_BY_CITY, params(json!({"city": "北京市"})));

        let reply = router.dispatch(request).await;

        assert_eq!(reply.status, Some(Status::Success));
        assert_eq!(reply.data.unwrap()[0]["city"], json!("北京市"));
    }

    #[tokio::test]
    async fn fail_without_city() {
        let router = router(Arc::new(FixedRepository));

        let reply = router
            .dispatch(Envelope::request("2", GET_STORE_BY_CITY, None))
            .await;

        assert_eq!(reply.status, Some(Status::Fail));
        assert_eq!(reply.msg.as_deref(), Some("missing parameter: city"));
    }

    #[tokio::test]
    async fn serve_raw_rows_for_analyses() {
        let router = router(Arc::new(FixedRepository));

        let reply = router
            .dispatch(Envelope::request("3", EXPANSION_TREND, None))
            .await;

        assert_eq!(reply.status, Some(Status::Success));
        assert_eq!(reply.data.unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn route_every_action() {
        let router = router(Arc::new(FixedRepository));
        let mut actions: Vec<_> = router.actions().collect();
        actions.sort_unstable();

        let mut expected = ANALYSIS_ACTIONS.to_vec();
        expected.push(GET_STORE_BY_CITY);
        expected.sort_unstable();

        assert_eq!(actions, expected);
    }
}
