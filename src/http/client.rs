use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::error::ClientError;
use super::request::{ApiRequest, ApiResponse, RetryableRequest};
use super::transport::Transport;
use crate::api::auth;
use crate::refresh::RefreshCoordinator;

/// HTTP client every outgoing call goes through.
///
/// A 401 on a renewal-eligible request is routed into the
/// [`RefreshCoordinator`]; once the wavefront's renewal succeeds the request
/// is replayed exactly once. Every other failure is returned untouched.
pub struct HttpClient {
    coordinator: RefreshCoordinator,
    transport: Arc<dyn Transport>,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn Transport>, coordinator: RefreshCoordinator) -> Self {
        Self {
            coordinator,
            transport,
        }
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Send a request, renewing credentials and replaying once on a 401.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut attempt = RetryableRequest::new(request);

        loop {
            let err = match self.transport.execute(&attempt.request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !err.is_unauthorized() || !attempt.may_renew() {
                return Err(err);
            }

            attempt.already_retried = true;
            debug!(
                request_id = %attempt.request.id,
                path = %attempt.request.path,
                "Authentication expired, waiting on credential renewal"
            );

            self.coordinator
                .renew(|| self.renew_credentials())
                .await?;

            debug!(request_id = %attempt.request.id, "Replaying request after renewal");
        }
    }

    /// The renewal call itself. Never routed back into the coordinator.
    async fn renew_credentials(&self) -> Result<(), ClientError> {
        let request = ApiRequest::post(auth::REFRESH).without_renewal();
        self.transport.execute(&request).await.map(|_| ())
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(body)?).await?.json()
    }

    pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await?.json()
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.send(ApiRequest::delete(path)).await?.json()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
