use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::error::ClientError;

/// Whether a 401 on this request may trigger (or join) a credential renewal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenewalPolicy {
    #[default]
    Eligible,
    Bypass,
}

/// An outgoing request descriptor. Kept intact so it can be replayed.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub body: Option<serde_json::Value>,
    /// Correlates log lines for the original attempt and its replay
    pub id: Uuid,
    pub method: Method,
    /// Path relative to the configured API base URL (e.g. `/auth/me`)
    pub path: String,
    pub renewal: RenewalPolicy,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            body: None,
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            renewal: RenewalPolicy::Eligible,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Exclude this request from credential renewal: a 401 is returned as-is.
    pub fn without_renewal(mut self) -> Self {
        self.renewal = RenewalPolicy::Bypass;
        self
    }

    /// True for anything that is not a pure read (GET/HEAD/OPTIONS/TRACE)
    pub fn is_state_changing(&self) -> bool {
        !self.method.is_safe()
    }
}

/// A request plus the bookkeeping needed to bound renewal to one retry.
///
/// The caller's descriptor is never mutated; the flag lives here.
#[derive(Debug, Clone)]
pub struct RetryableRequest {
    pub already_retried: bool,
    pub request: ApiRequest,
}

impl RetryableRequest {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            already_retried: false,
            request,
        }
    }

    /// Whether a 401 on the current attempt should go to the coordinator
    pub fn may_renew(&self) -> bool {
        !self.already_retried && self.request.renewal == RenewalPolicy::Eligible
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Vec<u8>,
    pub headers: HeaderMap,
    pub status: StatusCode,
}

impl ApiResponse {
    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
