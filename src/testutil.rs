//! Shared test helpers, available to all `#[cfg(test)]` modules in the crate.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use tokio::sync::Semaphore;

use crate::api::auth;
use crate::api::response::error_message;
use crate::config::{ApiConfig, Config, CsrfConfig, RouteConfig, SessionConfig};
use crate::http::{ApiRequest, ApiResponse, ClientError, HttpClient, Transport};
use crate::refresh::{RefreshCoordinator, RouteTracker};
use crate::session::{Session, SessionManager, SessionStore};

/// A minimal `Config` suitable for unit tests (in-memory profile, defaults).
pub fn test_config() -> Config {
    Config {
        api: ApiConfig::default(),
        csrf: CsrfConfig::default(),
        routes: RouteConfig::default(),
        session: SessionConfig::default(),
    }
}

/// Create a `Session` for the given user with fixed timestamps.
pub fn make_session(user_id: &str) -> Session {
    Session {
        city_id: Some("7".to_string()),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        email: format!("{user_id}@example.org"),
        role: "citizen".to_string(),
        updated_at: None,
        user_id: user_id.to_string(),
    }
}

#[derive(Debug, Clone)]
struct Call {
    authorized: bool,
    path: String,
}

/// In-process stand-in for the remote service.
///
/// Protected paths answer 401 until a login or a successful refresh
/// authorizes the "cookie". Refresh can be held open to build up a
/// wavefront of waiting requests.
pub struct ScriptedRemote {
    authorized: AtomicBool,
    calls: Mutex<Vec<Call>>,
    dropped: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    refresh_authorizes: AtomicBool,
    refresh_gate: Mutex<Option<Arc<Semaphore>>>,
    refresh_succeeds: AtomicBool,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self {
            authorized: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            dropped: Mutex::new(HashSet::from(["/unreachable".to_string()])),
            failing: Mutex::new(HashSet::new()),
            refresh_authorizes: AtomicBool::new(true),
            refresh_gate: Mutex::new(None),
            refresh_succeeds: AtomicBool::new(true),
        }
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    pub fn set_refresh_succeeds(&self, succeeds: bool) {
        self.refresh_succeeds.store(succeeds, Ordering::SeqCst);
    }

    /// Whether a successful refresh actually makes protected calls pass
    pub fn set_refresh_authorizes(&self, authorizes: bool) {
        self.refresh_authorizes.store(authorizes, Ordering::SeqCst);
    }

    /// Answer 500 on `path`
    pub fn fail_path(&self, path: &str) {
        self.failing.lock().insert(path.to_string());
    }

    /// Fail `path` without any response
    pub fn drop_path(&self, path: &str) {
        self.dropped.lock().insert(path.to_string());
    }

    /// Park refresh calls until [`release_refresh`](Self::release_refresh)
    pub fn hold_refresh(&self) {
        *self.refresh_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_refresh(&self) {
        if let Some(gate) = self.refresh_gate.lock().as_ref() {
            gate.add_permits(1 << 20);
        }
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.path == path).count()
    }

    pub fn authorized_calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.path == path && c.authorized)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    async fn respond(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let path = request.path.split('?').next().unwrap_or_default().to_string();
        let authorized = self.authorized.load(Ordering::SeqCst);
        self.calls.lock().push(Call {
            authorized,
            path: path.clone(),
        });

        if self.dropped.lock().contains(&path) {
            return Err(ClientError::Network {
                method: request.method.clone(),
                path,
                source: "connection refused".into(),
            });
        }
        if self.failing.lock().contains(&path) {
            return reply(request, StatusCode::INTERNAL_SERVER_ERROR, message("internal error"));
        }

        match path.as_str() {
            auth::LOGIN => {
                let body = request.body.clone().unwrap_or_default();
                if body["password"] == "wrong" {
                    return reply(request, StatusCode::UNAUTHORIZED, message("Invalid credentials"));
                }
                self.set_authorized(true);
                let email = body["email"].as_str().unwrap_or("ana@example.org");
                reply(request, StatusCode::OK, user(email))
            }
            auth::REGISTER => {
                self.set_authorized(true);
                let body = request.body.clone().unwrap_or_default();
                let email = body["email"].as_str().unwrap_or("ana@example.org");
                reply(request, StatusCode::CREATED, user(email))
            }
            auth::LOGOUT => {
                self.set_authorized(false);
                reply(request, StatusCode::NO_CONTENT, serde_json::Value::Null)
            }
            auth::REFRESH => {
                let gate = self.refresh_gate.lock().clone();
                if let Some(gate) = gate {
                    let _permit = gate.acquire().await;
                }
                if !self.refresh_succeeds.load(Ordering::SeqCst) {
                    return reply(request, StatusCode::UNAUTHORIZED, message("Refresh token expired"));
                }
                if self.refresh_authorizes.load(Ordering::SeqCst) {
                    self.set_authorized(true);
                }
                reply(request, StatusCode::OK, serde_json::json!({"success": true}))
            }
            auth::ME if authorized => reply(request, StatusCode::OK, user("ana@example.org")),
            auth::FORGOT_PASSWORD => reply(
                request,
                StatusCode::OK,
                message("If the account exists, an email was sent"),
            ),
            auth::RESET_PASSWORD => {
                let body = request.body.clone().unwrap_or_default();
                if body["token"] == "expired" {
                    reply(request, StatusCode::UNAUTHORIZED, message("Reset token expired"))
                } else {
                    reply(request, StatusCode::OK, message("Password updated"))
                }
            }
            _ if !authorized => reply(request, StatusCode::UNAUTHORIZED, message("Token expired")),
            p if p.starts_with("/reports/missing") => {
                reply(request, StatusCode::NOT_FOUND, message("report not found"))
            }
            _ => reply(request, StatusCode::OK, serde_json::json!({"ok": true})),
        }
    }
}

impl Transport for ScriptedRemote {
    fn execute<'a>(
        &'a self,
        request: &'a ApiRequest,
    ) -> BoxFuture<'a, Result<ApiResponse, ClientError>> {
        self.respond(request).boxed()
    }
}

fn message(text: &str) -> serde_json::Value {
    serde_json::json!({ "message": text })
}

fn user(email: &str) -> serde_json::Value {
    serde_json::json!({
        "user": {
            "userId": 101,
            "email": email,
            "role": "citizen",
            "cityId": 7,
            "createdAt": "2024-03-01T10:00:00Z"
        }
    })
}

fn reply(
    request: &ApiRequest,
    status: StatusCode,
    body: serde_json::Value,
) -> Result<ApiResponse, ClientError> {
    let body = if body.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec(&body).unwrap()
    };

    if status.is_success() {
        Ok(ApiResponse {
            body,
            headers: HeaderMap::new(),
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

/// A client wired to a [`ScriptedRemote`], with the store and navigator it
/// shares with the coordinator.
pub struct TestStack {
    pub client: Arc<HttpClient>,
    pub navigator: Arc<RouteTracker>,
    pub remote: Arc<ScriptedRemote>,
    pub store: Arc<SessionStore>,
}

impl TestStack {
    pub fn new() -> Self {
        let config = test_config();
        let remote = Arc::new(ScriptedRemote::new());
        let store = Arc::new(SessionStore::in_memory());
        let navigator = Arc::new(RouteTracker::new("/map"));
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&store),
            navigator.clone(),
            config.routes.clone(),
            config.session.waiter_capacity,
        );
        let client = Arc::new(HttpClient::new(remote.clone(), coordinator));

        Self {
            client,
            navigator,
            remote,
            store,
        }
    }

    pub fn manager(&self) -> SessionManager {
        SessionManager::new(Arc::clone(&self.client), Arc::clone(&self.store))
    }
}
