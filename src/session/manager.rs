//! Session facade: the state machine the rest of the application observes.
//!
//! `Loading` until bootstrap (or any explicit auth action) settles, then
//! `Authenticated` or `Unauthenticated` depending on whether the store holds
//! a profile. Deriving the state from the store keeps "session present" and
//! "authenticated" from ever disagreeing, including after a teardown driven
//! by a failed credential renewal.

use std::sync::Arc;

use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

use super::bootstrap;
use super::models::{AuthState, Session};
use super::store::{ProfileCache, SessionStore};
use crate::api::{Credentials, PasswordReset, Registration};
use crate::config::{Config, ConfigError};
use crate::http::{ClientError, HttpClient, HttpTransport};
use crate::refresh::{Navigator, RefreshCoordinator};

pub struct SessionManager {
    bootstrapped: OnceCell<()>,
    client: Arc<HttpClient>,
    ready: watch::Sender<bool>,
    store: Arc<SessionStore>,
}

impl SessionManager {
    pub fn new(client: Arc<HttpClient>, store: Arc<SessionStore>) -> Self {
        Self {
            bootstrapped: OnceCell::new(),
            client,
            ready: watch::Sender::new(false),
            store,
        }
    }

    /// Wire up store, transport, coordinator and client from configuration.
    pub fn from_config(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self, ConfigError> {
        let store = Arc::new(match &config.session.profile_cache_path {
            Some(path) => SessionStore::open(ProfileCache::new(path)),
            None => SessionStore::in_memory(),
        });

        let transport = HttpTransport::new(config)?;
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&store),
            navigator,
            config.routes.clone(),
            config.session.waiter_capacity,
        );
        let client = Arc::new(HttpClient::new(Arc::new(transport), coordinator));

        Ok(Self::new(client, store))
    }

    /// Client for domain calls; shares this session's renewal coordinator
    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Reconcile the cached profile with the remote service.
    ///
    /// Runs once per facade. Concurrent callers wait on the same
    /// verification; later calls return the current state.
    pub async fn bootstrap(&self) -> AuthState {
        self.bootstrapped
            .get_or_init(|| async {
                if *self.ready.borrow() {
                    return;
                }
                let state = bootstrap::bootstrap(&self.client, &self.store).await;
                self.mark_ready();
                info!(authenticated = state.is_authenticated(), "Session bootstrapped");
            })
            .await;
        self.state()
    }

    pub fn state(&self) -> AuthState {
        derive_state(*self.ready.borrow(), self.store.get())
    }

    pub fn user(&self) -> Option<Session> {
        self.state().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Observe state transitions
    pub fn watch(&self) -> AuthWatcher {
        AuthWatcher {
            ready: self.ready.subscribe(),
            session: self.store.subscribe(),
        }
    }

    /// Errors propagate untouched and leave the state as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        let user = self.client.auth().login(credentials).await?;
        info!(user_id = %user.user_id, "Logged in");
        self.publish(user.clone());
        Ok(user)
    }

    pub async fn register(&self, registration: &Registration) -> Result<Session, ClientError> {
        let user = self.client.auth().register(registration).await?;
        info!(user_id = %user.user_id, "Registered");
        self.publish(user.clone());
        Ok(user)
    }

    /// Best-effort remote logout; the local session is always cleared.
    pub async fn logout(&self) {
        if let Err(e) = self.client.auth().logout().await {
            warn!(error = %e, "Remote logout failed, clearing local session anyway");
        }
        self.store.clear();
        self.mark_ready();
        info!("Logged out");
    }

    /// Re-fetch the current profile. On failure the session is cleared.
    pub async fn refresh_user(&self) -> Option<Session> {
        match self.client.auth().me().await {
            Ok(user) => {
                self.publish(user.clone());
                Some(user)
            }
            Err(e) => {
                debug!(error = %e, "Profile refresh failed, clearing session");
                self.store.clear();
                self.mark_ready();
                None
            }
        }
    }

    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, ClientError> {
        self.client.auth().forgot_password(email).await
    }

    pub async fn reset_password(&self, reset: &PasswordReset) -> Result<Option<String>, ClientError> {
        self.client.auth().reset_password(reset).await
    }

    fn publish(&self, user: Session) {
        self.store.set(user);
        self.mark_ready();
    }

    fn mark_ready(&self) {
        self.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .finish()
    }
}

fn derive_state(ready: bool, session: Option<Session>) -> AuthState {
    if ready {
        AuthState::from(session)
    } else {
        AuthState::Loading
    }
}

/// Receiver side of [`SessionManager::watch`]
#[derive(Debug, Clone)]
pub struct AuthWatcher {
    ready: watch::Receiver<bool>,
    session: watch::Receiver<Option<Session>>,
}

impl AuthWatcher {
    pub fn current(&self) -> AuthState {
        derive_state(*self.ready.borrow(), self.session.borrow().clone())
    }

    /// Wait for the next transition. `None` once the manager is gone.
    pub async fn changed(&mut self) -> Option<AuthState> {
        let result = tokio::select! {
            r = self.ready.changed() => r,
            r = self.session.changed() => r,
        };
        result.ok()?;

        let ready = *self.ready.borrow_and_update();
        let session = self.session.borrow_and_update().clone();
        Some(derive_state(ready, session))
    }
}
