//! Collaborator contracts supplied by the hosting router

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::NavigatorFault;

/// Performs a navigation to a target path.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// `Ok(true)` on success. `Ok(false)` and `Err` are both failures.
    ///
    /// Implementations may notify the [`LocationObserver`] listener while this
    /// call is pending or after it resolves.
    async fn navigate(&self, path: &str) -> Result<bool, NavigatorFault>;
}

/// Synchronous read of the presently observed location.
pub trait CurrentLocation: Send + Sync {
    fn current_path(&self) -> Option<String>;
}

/// Callback invoked with the new path on every location transition
pub type LocationListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Reports every location change, whoever caused it.
///
/// Delivery order matches transition order. Duplicates are allowed.
pub trait LocationObserver: CurrentLocation {
    fn on_change(&self, listener: LocationListener) -> Subscription;
}

/// Keeps a listener attached until dropped or unsubscribed.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release
    pub fn detached() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_release_runs_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.unsubscribe();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&released);
            let _subscription = Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);

        drop(Subscription::detached());
    }
}
