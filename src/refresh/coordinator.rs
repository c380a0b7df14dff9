//! Single-flight credential renewal
//!
//! The first caller to hit an authentication-expired response becomes the
//! leader of a renewal wavefront and performs the one renewal call. Callers
//! that hit a 401 while that call is in flight park on a bounded waiter
//! queue and are settled together with the wavefront's outcome.
//!
//! All state changes happen inside short synchronous critical sections; the
//! lock is never held across an await.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::navigator::Navigator;
use crate::config::RouteConfig;
use crate::http::{ClientError, RenewalError};
use crate::session::SessionStore;

/// Default bound on the waiter queue
pub const DEFAULT_WAITER_CAPACITY: usize = 50;

type Waiter = oneshot::Sender<Result<(), RenewalError>>;

#[derive(Default)]
struct CoordinatorState {
    /// Wavefront currently renewing; `None` when no renewal is in flight
    in_flight: Option<u64>,
    last_wavefront: u64,
    waiters: VecDeque<Waiter>,
}

enum Ticket<'a> {
    Leader(InFlightGuard<'a>),
    Waiter(oneshot::Receiver<Result<(), RenewalError>>),
}

pub struct RefreshCoordinator {
    capacity: usize,
    navigator: Arc<dyn Navigator>,
    routes: RouteConfig,
    state: Mutex<CoordinatorState>,
    store: Arc<SessionStore>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        routes: RouteConfig,
        capacity: usize,
    ) -> Self {
        Self {
            capacity: capacity.max(1),
            navigator,
            routes,
            state: Mutex::new(CoordinatorState::default()),
            store,
        }
    }

    /// Run `perform` as the wavefront's renewal, or wait for the one already
    /// in flight.
    ///
    /// Exactly one `perform` runs per wavefront. Every caller of the wavefront
    /// receives the same outcome. On failure the session is torn down once.
    pub async fn renew<F, Fut>(&self, perform: F) -> Result<(), RenewalError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ClientError>>,
    {
        match self.join() {
            Ticket::Waiter(rx) => rx.await.unwrap_or(Err(RenewalError::Abandoned)),
            Ticket::Leader(guard) => {
                let outcome = perform().await;
                guard.settle(outcome)
            }
        }
    }

    /// Number of callers currently parked behind the in-flight renewal
    pub fn pending_waiters(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub fn is_renewing(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn join(&self) -> Ticket<'_> {
        let mut state = self.state.lock();

        if let Some(wavefront) = state.in_flight {
            if state.waiters.len() >= self.capacity {
                let shed = state.waiters.len();
                for waiter in state.waiters.drain(..) {
                    let _ = waiter.send(Err(RenewalError::QueueOverflow));
                }
                warn!(wavefront, shed, "Renewal waiter queue full, rejecting queued requests");
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(wavefront, queued = state.waiters.len(), "Waiting on in-flight renewal");
            return Ticket::Waiter(rx);
        }

        state.last_wavefront += 1;
        let wavefront = state.last_wavefront;
        state.in_flight = Some(wavefront);
        debug!(wavefront, "Starting credential renewal");

        Ticket::Leader(InFlightGuard {
            coordinator: self,
            settled: false,
            wavefront,
        })
    }

    /// Clear the marker and hand back the wavefront's waiters, in enqueue order
    fn finish_wavefront(&self) -> VecDeque<Waiter> {
        let mut state = self.state.lock();
        state.in_flight = None;
        std::mem::take(&mut state.waiters)
    }

    fn teardown(&self) {
        self.store.clear();

        let current = self.navigator.current_route();
        if current != self.routes.login && current != self.routes.register {
            info!(from = %current, to = %self.routes.login, "Redirecting to login after failed renewal");
            self.navigator.navigate(&self.routes.login);
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RefreshCoordinator")
            .field("capacity", &self.capacity)
            .field("in_flight", &state.in_flight)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

/// Held by the leader while its renewal runs.
///
/// Dropping it unsettled (the leader's future was cancelled) still clears
/// the marker and releases the wavefront.
struct InFlightGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
    wavefront: u64,
}

impl InFlightGuard<'_> {
    fn settle(mut self, outcome: Result<(), ClientError>) -> Result<(), RenewalError> {
        self.settled = true;
        let waiters = self.coordinator.finish_wavefront();
        let wavefront = self.wavefront;

        match outcome {
            Ok(()) => {
                info!(wavefront, waiters = waiters.len(), "Credential renewal succeeded");
                for waiter in waiters {
                    let _ = waiter.send(Ok(()));
                }
                Ok(())
            }
            Err(e) => {
                warn!(wavefront, waiters = waiters.len(), error = %e, "Credential renewal failed");
                let err = RenewalError::Failed(Arc::new(e));
                self.coordinator.teardown();
                for waiter in waiters {
                    let _ = waiter.send(Err(err.clone()));
                }
                Err(err)
            }
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let waiters = self.coordinator.finish_wavefront();
        warn!(
            wavefront = self.wavefront,
            waiters = waiters.len(),
            "Credential renewal abandoned"
        );
        for waiter in waiters {
            let _ = waiter.send(Err(RenewalError::Abandoned));
        }
    }
}
