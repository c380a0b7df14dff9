use parking_lot::Mutex;
use tracing::info;

/// Hook into the UI layer's routing, used for the renewal-failure redirect
pub trait Navigator: Send + Sync {
    /// Route of the view currently shown
    fn current_route(&self) -> String;

    /// Hard-navigate to `route`
    fn navigate(&self, route: &str);
}

/// In-process navigator that tracks the current view and every navigation
/// this layer forced.
#[derive(Debug)]
pub struct RouteTracker {
    inner: Mutex<RouteState>,
}

#[derive(Debug)]
struct RouteState {
    current: String,
    navigations: Vec<String>,
}

impl RouteTracker {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(RouteState {
                current: initial.into(),
                navigations: Vec::new(),
            }),
        }
    }

    /// Record that the UI moved to `route` on its own
    pub fn visit(&self, route: impl Into<String>) {
        self.inner.lock().current = route.into();
    }

    /// Navigations forced through [`Navigator::navigate`], oldest first
    pub fn navigations(&self) -> Vec<String> {
        self.inner.lock().navigations.clone()
    }
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for RouteTracker {
    fn current_route(&self) -> String {
        self.inner.lock().current.clone()
    }

    fn navigate(&self, route: &str) {
        let mut inner = self.inner.lock();
        info!(from = %inner.current, to = %route, "Navigating");
        inner.current = route.to_string();
        inner.navigations.push(route.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_visits_and_navigations() {
        let tracker = RouteTracker::default();
        assert_eq!(tracker.current_route(), "/");

        tracker.visit("/map");
        assert_eq!(tracker.current_route(), "/map");
        assert!(tracker.navigations().is_empty());

        tracker.navigate("/login");
        assert_eq!(tracker.current_route(), "/login");
        assert_eq!(tracker.navigations(), vec!["/login".to_string()]);
    }
}
