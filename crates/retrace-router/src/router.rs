//! In-memory router
//!
//! Holds a single current location. `navigate` moves it (subject to the
//! configured route rules) and `set_location` simulates a change made by
//! someone else, such as a back gesture. Every transition is delivered to the
//! registered listeners, outside the router's locks.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use retrace_history::{
    async_trait, CurrentLocation, LocationListener, LocationObserver, Navigator, NavigatorFault,
    Subscription,
};

use crate::error::RouterError;

type Listeners = Arc<RwLock<Vec<(u64, LocationListener)>>>;

/// How the router answers a navigation to a specific path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRule {
    /// Resolve with `false` and stay put
    Reject,
    /// Fail with [`RouterError::Fault`]
    Fault(String),
    /// Land on another path instead
    Redirect(String),
}

pub struct MemoryRouter {
    location: Arc<RwLock<String>>,
    listeners: Listeners,
    next_listener: Arc<AtomicU64>,
    rules: Arc<RwLock<HashMap<String, RouteRule>>>,
    /// Requested paths, in call order
    navigations: Arc<RwLock<Vec<String>>>,
    latency: Option<Duration>,
}

impl MemoryRouter {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            location: Arc::new(RwLock::new(initial.into())),
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_listener: Arc::new(AtomicU64::new(1)),
            rules: Arc::new(RwLock::new(HashMap::new())),
            navigations: Arc::new(RwLock::new(Vec::new())),
            latency: None,
        }
    }

    /// Delay every navigation by `latency` before it resolves
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn location(&self) -> String {
        self.location.read().clone()
    }

    /// Change the location from outside, e.g. a user's back gesture.
    ///
    /// Listeners are notified even if the location does not change.
    pub fn set_location(&self, path: impl Into<String>) {
        let path = path.into();
        *self.location.write() = path.clone();
        tracing::debug!(path = %path, "External location change");
        self.notify(&path);
    }

    /// Deliver the current location again
    pub fn renotify(&self) {
        let path = self.location();
        self.notify(&path);
    }

    pub fn reject(&self, path: impl Into<String>) {
        self.set_rule(path, RouteRule::Reject);
    }

    pub fn fail_with(&self, path: impl Into<String>, message: impl Into<String>) {
        self.set_rule(path, RouteRule::Fault(message.into()));
    }

    pub fn redirect(&self, from: impl Into<String>, to: impl Into<String>) {
        self.set_rule(from, RouteRule::Redirect(to.into()));
    }

    pub fn set_rule(&self, path: impl Into<String>, rule: RouteRule) {
        self.rules.write().insert(path.into(), rule);
    }

    pub fn clear_rule(&self, path: &str) {
        self.rules.write().remove(path);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.read().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn notify(&self, path: &str) {
        let listeners: Vec<LocationListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(path);
        }
    }

    /// Move to `path`, notifying only on an actual transition.
    fn move_to(&self, path: &str) {
        let changed = {
            let mut location = self.location.write();
            if *location == path {
                false
            } else {
                *location = path.to_string();
                true
            }
        };

        if changed {
            self.notify(path);
        }
    }
}

impl Clone for MemoryRouter {
    fn clone(&self) -> Self {
        Self {
            location: Arc::clone(&self.location),
            listeners: Arc::clone(&self.listeners),
            next_listener: Arc::clone(&self.next_listener),
            rules: Arc::clone(&self.rules),
            navigations: Arc::clone(&self.navigations),
            latency: self.latency,
        }
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new("/")
    }
}

#[async_trait]
impl Navigator for MemoryRouter {
    async fn navigate(&self, path: &str) -> Result<bool, NavigatorFault> {
        self.navigations.write().push(path.to_string());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let rule = self.rules.read().get(path).cloned();
        match rule {
            Some(RouteRule::Reject) => {
                tracing::debug!(path, "Navigation rejected");
                Ok(false)
            }
            Some(RouteRule::Fault(message)) => Err(RouterError::Fault {
                path: path.to_string(),
                message,
            }
            .into()),
            Some(RouteRule::Redirect(target)) => {
                tracing::debug!(from = path, to = %target, "Navigation redirected");
                self.move_to(&target);
                Ok(true)
            }
            None => {
                self.move_to(path);
                Ok(true)
            }
        }
    }
}

impl CurrentLocation for MemoryRouter {
    fn current_path(&self) -> Option<String> {
        Some(self.location()).filter(|path| !path.is_empty())
    }
}

impl LocationObserver for MemoryRouter {
    fn on_change(&self, listener: LocationListener) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, listener));

        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            listeners.write().retain(|(other, _)| *other != id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_history::{HistoryConfig, NavigationErrorKind, NavigationHistory};

    fn recorder(router: &MemoryRouter) -> (Arc<RwLock<Vec<String>>>, Subscription) {
        let seen = Arc::new(RwLock::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = router.on_change(Arc::new(move |path: &str| {
            sink.write().push(path.to_string());
        }));
        (seen, subscription)
    }

    fn history_on(router: &MemoryRouter, config: HistoryConfig) -> NavigationHistory {
        NavigationHistory::new(config, Arc::new(router.clone()), Arc::new(router.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_navigate_moves_and_notifies() {
        let router = MemoryRouter::new("/");
        let (seen, _subscription) = recorder(&router);

        assert!(router.navigate("/a").await.unwrap());
        assert!(router.navigate("/a").await.unwrap());

        assert_eq!(router.location(), "/a");
        assert_eq!(*seen.read(), vec!["/a"]);
        assert_eq!(router.navigations(), vec!["/a", "/a"]);
    }

    #[tokio::test]
    async fn test_route_rules() {
        let router = MemoryRouter::new("/");
        router.reject("/private");
        router.fail_with("/broken", "backend down");
        router.redirect("/old", "/new");

        assert!(!router.navigate("/private").await.unwrap());
        assert_eq!(router.location(), "/");

        let fault = router.navigate("/broken").await.unwrap_err();
        assert_eq!(
            fault.downcast_ref::<RouterError>(),
            Some(&RouterError::Fault {
                path: "/broken".to_string(),
                message: "backend down".to_string(),
            })
        );

        assert!(router.navigate("/old").await.unwrap());
        assert_eq!(router.location(), "/new");

        router.clear_rule("/private");
        assert!(router.navigate("/private").await.unwrap());
        assert_eq!(router.location(), "/private");
    }

    #[test]
    fn test_external_changes_always_notify() {
        let router = MemoryRouter::default();
        let (seen, subscription) = recorder(&router);

        router.set_location("/a");
        router.set_location("/a");
        router.renotify();
        assert_eq!(*seen.read(), vec!["/a", "/a", "/a"]);

        subscription.unsubscribe();
        assert_eq!(router.listener_count(), 0);
        router.set_location("/b");
        assert_eq!(seen.read().len(), 3);
        assert_eq!(router.current_path().as_deref(), Some("/b"));
    }

    #[test]
    fn test_empty_location_reads_as_none() {
        let router = MemoryRouter::new("");
        assert_eq!(router.current_path(), None);
    }

    #[tokio::test]
    async fn test_history_follows_browsing_session() {
        crate::init_logging();
        let router = MemoryRouter::new("/home");
        let history = history_on(&router, HistoryConfig::new().with_debug_mode(true));

        router.set_location("/docs");
        router.set_location("/docs/intro");
        router.set_location("/docs/setup");

        assert!(history.go_back().await);
        assert!(history.go_back().await);
        assert_eq!(router.location(), "/docs");
        assert_eq!(history.current_state().current_index, 1);

        assert!(history.navigate_to_path("/home").await);
        assert_eq!(router.location(), "/home");

        assert!(history.go_forward().await);
        assert_eq!(router.location(), "/docs");

        let state = history.current_state();
        assert_eq!(state.paths, vec!["/home", "/docs", "/docs/intro", "/docs/setup"]);
        assert_eq!(state.current_index, 1);
        assert!(state.can_go_back);
        assert!(state.can_go_forward);
        assert!(!state.is_navigating);
    }

    #[tokio::test]
    async fn test_gesture_after_going_back_drops_forward_branch() {
        let router = MemoryRouter::new("/a");
        let history = history_on(&router, HistoryConfig::default());
        router.set_location("/b");
        router.set_location("/c");

        assert!(history.navigate_to_index(0).await);
        router.set_location("/d");

        let state = history.current_state();
        assert_eq!(state.paths, vec!["/a", "/d"]);
        assert_eq!(state.current_index, 1);
        assert!(!state.can_go_forward);
    }

    #[tokio::test]
    async fn test_duplicate_deliveries_do_not_grow_history() {
        let router = MemoryRouter::new("/a");
        let history = history_on(&router, HistoryConfig::default());
        router.set_location("/b");
        router.renotify();
        router.set_location("/b");

        assert_eq!(history.history_length(), 2);
    }

    #[tokio::test]
    async fn test_redirect_echo_is_not_recorded() {
        let router = MemoryRouter::new("/a");
        let history = history_on(&router, HistoryConfig::default());
        router.set_location("/b");
        router.redirect("/a", "/login");

        assert!(history.go_back().await);

        let state = history.current_state();
        assert_eq!(state.paths, vec!["/a", "/b"]);
        assert_eq!(state.current_index, 0);
        assert!(!state.is_navigating);
        assert_eq!(router.location(), "/login");
    }

    #[tokio::test]
    async fn test_failed_navigation_reports_and_recovers() {
        let router = MemoryRouter::new("/a");
        let history = history_on(&router, HistoryConfig::default());
        router.set_location("/b");
        router.fail_with("/a", "backend down");
        let mut errors = history.subscribe_errors();

        assert!(!history.go_back().await);
        let error = errors.try_recv().unwrap();
        assert_eq!(error.kind, NavigationErrorKind::NavigationFailed);
        assert!(error.message.contains("backend down"));
        assert!(!history.is_navigating());

        router.clear_rule("/a");
        assert!(history.navigate_to_path("/a").await);
        assert_eq!(router.location(), "/a");
    }

    #[tokio::test]
    async fn test_slow_router_serializes_requests() {
        let router = MemoryRouter::new("/a").with_latency(Duration::from_millis(10));
        let history = history_on(&router, HistoryConfig::default());
        router.set_location("/b");
        router.set_location("/c");
        let mut errors = history.subscribe_errors();

        let (back, forward) = tokio::join!(history.go_back(), history.go_forward());

        assert!(back);
        assert!(forward);
        assert_eq!(
            errors.try_recv().unwrap().kind,
            NavigationErrorKind::ConcurrentNavigation
        );
        assert_eq!(router.navigations(), vec!["/b", "/c"]);
        assert_eq!(router.location(), "/c");
        assert_eq!(history.current_state().current_index, 2);
    }

    #[tokio::test]
    async fn test_timed_out_navigation_does_not_outlive_history() {
        let router = MemoryRouter::new("/a").with_latency(Duration::from_millis(50));
        let history = history_on(&router, HistoryConfig::default());
        router.set_location("/b");

        let timed_out = tokio::time::timeout(Duration::from_millis(5), history.go_back()).await;
        assert!(timed_out.is_err());
        assert!(history.is_navigating());

        drop(history);
        assert_eq!(router.listener_count(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        router.set_location("/c");
        assert_eq!(router.navigations(), vec!["/a"]);
        assert_eq!(router.location(), "/c");
    }

    #[tokio::test]
    async fn test_configured_bound_applies_end_to_end() {
        let config = HistoryConfig::from_json_str(r#"{"maxHistoryLength": 3}"#).unwrap();
        let router = MemoryRouter::new("/0");
        let history = history_on(&router, config);

        for i in 1..6 {
            router.set_location(format!("/{}", i));
        }

        assert_eq!(history.current_state().paths, vec!["/3", "/4", "/5"]);
        assert!(history.initialize(Some("/fresh")).await);
        assert_eq!(history.current_state().paths, vec!["/fresh"]);
        assert_eq!(router.location(), "/fresh");
    }

    #[test]
    fn test_dispose_detaches_from_router() {
        let router = MemoryRouter::new("/a");
        let history = history_on(&router, HistoryConfig::default());
        assert_eq!(router.listener_count(), 1);

        history.dispose();
        assert_eq!(router.listener_count(), 0);

        router.set_location("/b");
        assert_eq!(history.history_length(), 1);
    }
}
