use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

use super::request::ApiRequest;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced to callers of the HTTP layer
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received (connection refused, DNS, timeout, ...)
    #[error("Request {} {} failed: {source}", .method, .path)]
    Network {
        method: reqwest::Method,
        path: String,
        #[source]
        source: BoxError,
    },
    /// The remote service answered with a non-2xx status
    #[error("{} {} returned {}{}", .request.method, .request.path, .status, display_message(.message))]
    Status {
        message: Option<String>,
        request: Box<ApiRequest>,
        status: StatusCode,
    },
    #[error(transparent)]
    Renewal(#[from] RenewalError),
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Outcome of a credential renewal, shared by every waiter in a wavefront
#[derive(Debug, Clone, Error)]
pub enum RenewalError {
    #[error("Credential renewal failed: {0}")]
    Failed(#[source] Arc<ClientError>),
    #[error("Too many requests waiting on credential renewal")]
    QueueOverflow,
    #[error("Credential renewal was abandoned before it settled")]
    Abandoned,
}

impl ClientError {
    /// HTTP status of the failure, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for an authentication-expired (401) response
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// The descriptor of the request that failed, when known
    pub fn request(&self) -> Option<&ApiRequest> {
        match self {
            ClientError::Status { request, .. } => Some(request),
            _ => None,
        }
    }

    /// Server-provided message for a non-2xx response
    pub fn message(&self) -> Option<&str> {
        match self {
            ClientError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_renewal_failure(&self) -> bool {
        matches!(self, ClientError::Renewal(RenewalError::Failed(_)))
    }

    pub fn is_queue_overflow(&self) -> bool {
        matches!(self, ClientError::Renewal(RenewalError::QueueOverflow))
    }
}

fn display_message(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}
