//! Provisioning scope for the session facade.
//!
//! Code running inside [`provide`] reaches the facade through [`current`].
//! Reaching for it anywhere else is a wiring bug and panics.

use std::future::Future;
use std::sync::Arc;

use super::manager::SessionManager;

tokio::task_local! {
    static CURRENT: Arc<SessionManager>;
}

/// Run `f` with `manager` available through [`current`].
pub async fn provide<F: Future>(manager: Arc<SessionManager>, f: F) -> F::Output {
    CURRENT.scope(manager, f).await
}

/// The facade provided to the running task.
///
/// # Panics
///
/// Panics when called outside of a [`provide`] scope.
pub fn current() -> Arc<SessionManager> {
    match try_current() {
        Some(manager) => manager,
        None => panic!("session facade used outside of a session provider scope"),
    }
}

pub fn try_current() -> Option<Arc<SessionManager>> {
    CURRENT.try_with(Arc::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthState;
    use crate::testutil::TestStack;

    #[tokio::test]
    async fn test_current_inside_scope() {
        let stack = TestStack::new();
        let manager = Arc::new(stack.manager());

        let state = provide(Arc::clone(&manager), async {
            current().bootstrap().await
        })
        .await;

        assert_eq!(state, AuthState::Unauthenticated);
        assert!(try_current().is_none());
    }

    #[tokio::test]
    #[should_panic(expected = "outside of a session provider scope")]
    async fn test_current_outside_scope_panics() {
        let _ = current();
    }
}
