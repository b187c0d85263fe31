use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments of a request, their shape depends on the action
pub type Params = Map<String, Value>;

/// Result of a processed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The request has been processed
    Success,
    /// The request could not be processed, the `msg` of the envelope tells why
    Fail,
}

/// Message exchanged between tiers, used for requests and replies alike
///
/// Requests carry `params`, replies carry `status`, `msg` and `data`. The `requestId` and `action`
/// of a request are echoed unchanged by every reply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Caller generated correlation token
    pub request_id: String,
    /// Operation to perform
    pub action: String,
    /// Operation arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Outcome of processing, only present in replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Human readable detail, always present on failed replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Action specific result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Creates a new request
    pub fn request(
        request_id: impl Into<String>,
        action: impl Into<String>,
        params: Option<Params>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            action: action.into(),
            params,
            status: None,
            msg: None,
            data: None,
        }
    }

    /// Creates a successful reply to this request
    pub fn succeed(&self, data: Value) -> Self {
        Self {
            request_id: self.request_id.clone(),
            action: self.action.clone(),
            params: None,
            status: Some(Status::Success),
            msg: None,
            data: Some(data),
        }
    }

    /// Creates a failed reply to this request
    pub fn fail(&self, msg: impl Into<String>) -> Self {
        Self {
            request_id: self.request_id.clone(),
            action: self.action.clone(),
            params: None,
            status: Some(Status::Fail),
            msg: Some(msg.into()),
            data: None,
        }
    }

    /// Whether this is a reply reporting success
    pub fn is_success(&self) -> bool {
        self.status == Some(Status::Success)
    }
}
