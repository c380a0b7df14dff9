pub mod bootstrap;
pub mod context;
mod manager;
mod models;
mod store;

pub use bootstrap::bootstrap;
pub use manager::{AuthWatcher, SessionManager};
pub use models::{AuthState, Session};
pub use store::{CacheError, ProfileCache, SessionStore};
