use crate::domain::{
    BUSINESS_HOURS_ANALYSIS, EXPANSION_TREND, GEOGRAPHIC_DISPERSION, GET_STORE_BY_CITY,
    HOURS_VS_AGE_CORRELATION,
};
use crate::library::communication::event::Publisher;
use crate::library::communication::request::{Envelope, Params, RequestError, Requestor, Status};
use crate::library::communication::BlackboxError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use warp::{Filter, Rejection, Reply};

const CITY_TIMEOUT: Duration = Duration::from_secs(10);
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(15);

const CITY_SUFFIX: char = '市';

/// Normalizes a city name to the form used in the store table
///
/// Chinese city names, including the municipalities like `北京`, are stored with their `市`
/// suffix which users commonly omit. Names written in latin script are left alone.
pub fn normalize_city(city: &str) -> String {
    let city = city.trim();

    if city.is_ascii() || city.ends_with(CITY_SUFFIX) {
        city.to_owned()
    } else {
        format!("{}{}", city, CITY_SUFFIX)
    }
}

/// Action computing the analysis exposed under the given path segment
pub fn analysis_action(kind: &str) -> Option<&'static str> {
    match kind {
        "business" => Some(BUSINESS_HOURS_ANALYSIS),
        "expansion" => Some(EXPANSION_TREND),
        "geo" => Some(GEOGRAPHIC_DISPERSION),
        "correlation" => Some(HOURS_VS_AGE_CORRELATION),
        _ => None,
    }
}

/// Failure that occurred before any reply was received
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    status: Status,
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl From<RequestError> for Failure {
    fn from(error: RequestError) -> Self {
        let request_id = match &error {
            RequestError::TimedOut { request_id } => Some(request_id.clone()),
            _ => None,
        };

        let msg = match &error {
            RequestError::TimedOut { .. } => "request timed out".to_owned(),
            _ => BlackboxError::new(error).to_string(),
        };

        Self {
            status: Status::Fail,
            msg,
            request_id,
        }
    }
}

/// Body returned to HTTP clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    /// Reply of the business tier, successful or not
    Reply(Envelope),
    /// No reply could be obtained
    Failure(Failure),
}

impl Answer {
    /// Whether the business tier replied successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Answer::Reply(reply) if reply.is_success())
    }
}

#[derive(Debug, Deserialize)]
struct CityQuery {
    city: String,
}

/// Synchronous facade of the tiers behind the broker
pub struct Gateway<P: Publisher> {
    requestor: Requestor<P>,
    city_timeout: Duration,
    analysis_timeout: Duration,
}

impl<P: Publisher + Send + Sync> Gateway<P> {
    /// Creates a new instance using the default timeouts
    pub fn new(requestor: Requestor<P>) -> Self {
        Self {
            requestor,
            city_timeout: CITY_TIMEOUT,
            analysis_timeout: ANALYSIS_TIMEOUT,
        }
    }

    /// Overrides how long to wait for replies to store and analysis queries
    pub fn with_timeouts(mut self, city: Duration, analysis: Duration) -> Self {
        self.city_timeout = city;
        self.analysis_timeout = analysis;
        self
    }

    /// Looks up all stores of a city
    pub async fn store_by_city(&self, city: &str) -> Answer {
        let mut params = Params::new();
        params.insert("city".into(), Value::String(normalize_city(city)));

        self.call(GET_STORE_BY_CITY, Some(params), self.city_timeout)
            .await
    }

    /// Runs the analysis exposed under the given path segment, `None` if there is no such analysis
    pub async fn analysis(&self, kind: &str) -> Option<Answer> {
        let action = analysis_action(kind)?;
        Some(self.call(action, None, self.analysis_timeout).await)
    }

    async fn call(&self, action: &str, params: Option<Params>, timeout: Duration) -> Answer {
        match self.requestor.call(action, params, timeout).await {
            Ok(reply) => {
                debug!(request_id = %reply.request_id, status = ?reply.status, "Received reply");
                Answer::Reply(reply)
            }
            Err(error) => {
                warn!(action, %error, "Request failed");
                Answer::Failure(error.into())
            }
        }
    }
}

/// HTTP routes exposing a [`Gateway`]
pub fn routes<P>(
    gateway: Arc<Gateway<P>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    P: Publisher + Send + Sync + 'static,
{
    let with_gateway = warp::any().map(move || gateway.clone());

    let store_route = warp::get()
        .and(warp::path!("api" / "store" / "city"))
        .and(warp::query::<CityQuery>())
        .and(with_gateway.clone())
        .and_then(|query: CityQuery, gateway: Arc<Gateway<P>>| async move {
            let answer = gateway.store_by_city(&query.city).await;
            Ok::<_, Infallible>(warp::reply::json(&answer))
        })
        .with(warp::trace::named("store"));

    let analysis_route = warp::get()
        .and(warp::path!("api" / "analysis" / String))
        .and(with_gateway)
        .and_then(|kind: String, gateway: Arc<Gateway<P>>| async move {
            match gateway.analysis(&kind).await {
                Some(answer) => Ok(warp::reply::json(&answer)),
                None => Err(warp::reject::not_found()),
            }
        })
        .with(warp::trace::named("analysis"));

    store_route
        .or(analysis_route)
        .with(warp::trace::request())
}
