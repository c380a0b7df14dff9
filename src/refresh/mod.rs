mod coordinator;
mod navigator;

pub use coordinator::{RefreshCoordinator, DEFAULT_WAITER_CAPACITY};
pub use navigator::{Navigator, RouteTracker};
