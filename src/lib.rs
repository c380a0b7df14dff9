//! canopy-session - session and request-resilience layer for the canopy
//! tree inventory client
//!
//! Every outgoing call to the remote service passes through this crate:
//! - CSRF token mirrored from cookie to header on state-changing requests
//! - Authentication-expired (401) detection with one transparent replay
//! - Single-flight credential renewal shared by all concurrently failing
//!   requests, behind a bounded waiter queue
//! - Deterministic session teardown and login redirect when renewal fails
//! - Cached user profile with a `Loading → Authenticated | Unauthenticated`
//!   state machine on top

pub mod api;
pub mod config;
pub mod http;
pub mod refresh;
pub mod session;
#[cfg(test)]
pub mod testutil;

pub use config::Config;
pub use http::{ApiRequest, ApiResponse, ClientError, HttpClient, RenewalError};
pub use refresh::{Navigator, RouteTracker};
pub use session::{AuthState, Session, SessionManager};
