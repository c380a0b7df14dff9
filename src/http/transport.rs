//! Network transport for the remote service.
//!
//! Sends requests with the cookie jar attached so the authentication and
//! CSRF cookies travel automatically. Non-2xx answers come back as
//! [`ClientError::Status`] carrying the original descriptor for replay.
//! There is no retry policy here.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::Url;
use tracing::debug;

use super::csrf::CsrfAttacher;
use super::error::ClientError;
use super::request::{ApiRequest, ApiResponse};
use crate::api::response::error_message;
use crate::config::{normalize_base_url, Config, ConfigError};

/// Anything that can put an [`ApiRequest`] on the wire
pub trait Transport: Send + Sync {
    fn execute<'a>(&'a self, request: &'a ApiRequest)
        -> BoxFuture<'a, Result<ApiResponse, ClientError>>;
}

/// reqwest-backed transport with a shared cookie jar
pub struct HttpTransport {
    base_url: Url,
    client: reqwest::Client,
    csrf: CsrfAttacher,
    jar: Arc<Jar>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&normalize_base_url(&config.api.base_url))
            .map_err(|e| ConfigError::ValidationError(format!("Invalid API base URL: {e}")))?;

        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .build()?;

        Ok(Self {
            base_url,
            client,
            csrf: CsrfAttacher::new(&config.csrf)?,
            jar,
        })
    }

    /// Resolve an endpoint path against the base URL
    pub fn url_for(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = self.url_for(&request.path)?;

        let mut headers = HeaderMap::new();
        self.csrf
            .attach(&request.method, self.jar.as_ref(), &url, &mut headers);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(request_id = %request.id, method = %request.method, path = %request.path, "Sending request");

        let network_error = |e: reqwest::Error| ClientError::Network {
            method: request.method.clone(),
            path: request.path.clone(),
            source: Box::new(e),
        };

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        // Once the status line is in, a broken body no longer hides the status
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) if !status.is_success() => {
                debug!(request_id = %request.id, status = status.as_u16(), error = %e, "Failed to read error body");
                Vec::new()
            }
            Err(e) => return Err(network_error(e)),
        };

        debug!(request_id = %request.id, status = status.as_u16(), "Received response");

        if status.is_success() {
            Ok(ApiResponse {
                body,
                headers,
                status,
            })
        } else {
            Err(ClientError::Status {
                message: error_message(&body),
                request: Box::new(request.clone()),
                status,
            })
        }
    }
}

impl Transport for HttpTransport {
    fn execute<'a>(
        &'a self,
        request: &'a ApiRequest,
    ) -> BoxFuture<'a, Result<ApiResponse, ClientError>> {
        self.send(request).boxed()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("csrf_header", self.csrf.header_name())
            .finish()
    }
}
