use tracing::{debug, info};

use super::models::AuthState;
use super::store::SessionStore;
use crate::http::HttpClient;

/// Reconcile the cached profile with the remote service, once, at startup.
///
/// No cached profile means no network call. A failed verification is an
/// expected outcome (stale cache, revoked cookie) and is not reported as an
/// error: the cache is cleared and the result is `Unauthenticated`.
pub async fn bootstrap(client: &HttpClient, store: &SessionStore) -> AuthState {
    let Some(cached) = store.get() else {
        debug!("No cached profile, starting unauthenticated");
        return AuthState::Unauthenticated;
    };

    match client.auth().me().await {
        Ok(user) => {
            info!(user_id = %user.user_id, "Cached session verified");
            store.set(user.clone());
            AuthState::Authenticated(user)
        }
        Err(e) => {
            debug!(user_id = %cached.user_id, error = %e, "Cached session rejected");
            store.clear();
            AuthState::Unauthenticated
        }
    }
}
