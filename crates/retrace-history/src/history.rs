//! Navigation history state machine
//!
//! ```text
//! Uninitialized
//!   ↓ initialize / auto-initialize
//! Idle ⇄ Navigating
//! ```
//!
//! Requests made through this type (`go_back`, `go_forward`,
//! `navigate_to_path`, `navigate_to_index`, `initialize`) are internal: the
//! stack is updated before the navigator is called, and the location change
//! that follows is only an echo. Any other location change is external and
//! appends a new entry.
//!
//! At most one navigator call is in flight. A request arriving meanwhile is
//! reported as `CONCURRENT_NAVIGATION` and waits on the running navigation's
//! shared handle before taking the slot itself. Waiters are not ordered: with
//! three or more callers, whichever waiter is polled first runs next.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};

use crate::config::HistoryConfig;
use crate::error::{NavigationError, NavigationErrorKind, NavigatorFault};
use crate::events::{self, EventHub};
use crate::location::{LocationObserver, Navigator, Subscription};
use crate::stack::HistoryStack;
use crate::state::NavigationState;

type NavigationHandle = Shared<BoxFuture<'static, bool>>;

struct InFlight {
    ticket: u64,
    handle: NavigationHandle,
}

/// Mutable state, only touched under the lock and never across an await.
struct HistoryCore {
    stack: HistoryStack,
    is_navigating: bool,
    is_internal: bool,
    initialized: bool,
    /// Last path reported by the observer or confirmed by the navigator
    last_observed: Option<String>,
    debug_mode: bool,
    /// `None` once disposed
    hub: Option<EventHub>,
}

impl HistoryCore {
    fn is_disposed(&self) -> bool {
        self.hub.is_none()
    }

    fn snapshot(&self) -> NavigationState {
        NavigationState::capture(&self.stack, self.is_navigating)
    }

    fn emit(&self) {
        if let Some(hub) = &self.hub {
            let snapshot = self.snapshot();
            if self.debug_mode {
                tracing::debug!(
                    index = snapshot.current_index,
                    length = snapshot.history_length,
                    path = ?snapshot.current_path,
                    navigating = snapshot.is_navigating,
                    "Navigation state changed"
                );
            }
            hub.publish_state(snapshot);
        }
    }

    fn report(&self, error: NavigationError) {
        tracing::warn!(kind = %error.kind, message = %error.message, "Navigation error");
        if let Some(hub) = &self.hub {
            hub.publish_error(error);
        }
    }

    fn clear_flags(&mut self) {
        self.is_navigating = false;
        self.is_internal = false;
    }

    /// Settle a successful internal navigation the observer never echoed.
    fn confirm(&mut self, target: &str) {
        if self.is_internal {
            self.clear_flags();
            self.last_observed = Some(target.to_string());
        }
    }
}

struct Inner {
    config: HistoryConfig,
    navigator: Arc<dyn Navigator>,
    location: Arc<dyn LocationObserver>,
    core: Mutex<HistoryCore>,
    in_flight: Mutex<Option<InFlight>>,
    next_ticket: AtomicU64,
    subscription: Mutex<Option<Subscription>>,
}

impl Inner {
    fn resolve_target(&self, path: Option<&str>) -> String {
        path.filter(|p| !p.is_empty())
            .map(str::to_string)
            .or_else(|| self.location.current_path().filter(|p| !p.is_empty()))
            .unwrap_or_else(|| self.config.default_route.clone())
    }

    fn auto_initialize(&self) {
        let target = self.resolve_target(None);
        let mut core = self.core.lock();
        if core.stack.contains(&target) {
            return;
        }

        core.stack.reset(target.clone());
        core.initialized = true;
        tracing::info!(path = %target, "Navigation history auto-initialized");
        core.last_observed = Some(target);
        core.emit();
    }

    /// Observer callback.
    fn observe(&self, path: &str) {
        let mut core = self.core.lock();
        if core.is_disposed() {
            return;
        }

        if core.last_observed.as_deref() == Some(path) {
            if core.debug_mode {
                tracing::debug!(path, "Ignoring duplicate location notification");
            }
            return;
        }
        core.last_observed = Some(path.to_string());

        if core.is_internal {
            core.clear_flags();
            if core.debug_mode {
                tracing::debug!(path, "Internal navigation confirmed");
            }
            core.emit();
            return;
        }

        let evicted = core.stack.push(path);
        if core.debug_mode {
            tracing::debug!(
                path,
                index = core.stack.current_index(),
                evicted,
                "Recorded external navigation"
            );
        }
        core.emit();
    }

    fn report_concurrent(&self) {
        self.core.lock().report(NavigationError::new(
            NavigationErrorKind::ConcurrentNavigation,
            "Navigation already in progress; request queued",
        ));
    }

    fn back_target(&self) -> Option<usize> {
        let core = self.core.lock();
        if core.is_disposed() {
            return None;
        }
        if !core.stack.can_go_back() {
            core.report(NavigationError::new(
                NavigationErrorKind::InvalidIndex,
                "Cannot go back: already at the oldest entry",
            ));
            return None;
        }
        Some(core.stack.current_index() - 1)
    }

    fn forward_target(&self) -> Option<usize> {
        let core = self.core.lock();
        if core.is_disposed() {
            return None;
        }
        if !core.stack.can_go_forward() {
            core.report(NavigationError::new(
                NavigationErrorKind::InvalidIndex,
                "Cannot go forward: already at the newest entry",
            ));
            return None;
        }
        Some(core.stack.current_index() + 1)
    }

    fn path_target(&self, path: &str) -> Option<usize> {
        let core = self.core.lock();
        if core.is_disposed() {
            return None;
        }
        let position = core.stack.position(path);
        if position.is_none() {
            core.report(NavigationError::new(
                NavigationErrorKind::InvalidIndex,
                format!("Path not found in history: {}", path),
            ));
        }
        position
    }

    fn check_index(&self, index: usize) -> bool {
        let core = self.core.lock();
        if core.is_disposed() {
            return false;
        }
        if index >= core.stack.len() {
            core.report(NavigationError::new(
                NavigationErrorKind::InvalidIndex,
                format!(
                    "Index {} is out of range for history of length {}",
                    index,
                    core.stack.len()
                ),
            ));
            return false;
        }
        true
    }

    /// Claim the in-flight slot for `handle`, or return the handle holding it.
    fn claim(&self, ticket: u64, handle: &NavigationHandle) -> Option<NavigationHandle> {
        let mut slot = self.in_flight.lock();
        match slot.as_ref() {
            Some(current) => Some(current.handle.clone()),
            None => {
                *slot = Some(InFlight {
                    ticket,
                    handle: handle.clone(),
                });
                None
            }
        }
    }

    fn release(&self, ticket: u64) {
        let mut slot = self.in_flight.lock();
        if slot.as_ref().map(|current| current.ticket) == Some(ticket) {
            *slot = None;
        }
    }

    /// Optimistically move to `index` and mark the navigation as internal.
    ///
    /// Returns the target path and the index it replaces.
    fn begin_index_navigation(&self, index: usize) -> Option<(String, usize)> {
        let mut core = self.core.lock();
        if core.is_disposed() {
            return None;
        }

        // The stack may have changed while this request was queued.
        let Some(target) = core.stack.get(index).map(str::to_string) else {
            core.report(NavigationError::new(
                NavigationErrorKind::InvalidIndex,
                format!(
                    "Index {} is no longer in range for history of length {}",
                    index,
                    core.stack.len()
                ),
            ));
            return None;
        };

        let previous = core.stack.current_index();
        core.stack.set_current(index);
        core.is_navigating = true;
        core.is_internal = true;
        if core.debug_mode {
            tracing::debug!(from = previous, to = index, path = %target, "Navigating to index");
        }
        core.emit();

        Some((target, previous))
    }

    fn finish_index_navigation(
        &self,
        target: &str,
        index: usize,
        previous: usize,
        outcome: Result<bool, NavigatorFault>,
    ) -> bool {
        let mut core = self.core.lock();
        let error = match outcome {
            Ok(true) => {
                core.confirm(target);
                core.emit();
                return true;
            }
            Ok(false) => NavigationError::new(
                NavigationErrorKind::NavigationFailed,
                format!("Navigator rejected navigation to {}", target),
            ),
            Err(fault) => NavigationError::new(
                NavigationErrorKind::NavigationFailed,
                format!("Navigation to {} failed: {}", target, fault),
            )
            .with_source(fault),
        };

        core.clear_flags();
        if self.config.rollback_on_failure && core.stack.current_index() == index {
            core.stack.set_current(previous);
        }
        core.report(error);
        core.emit();
        false
    }

    fn begin_initialize(&self, target: &str) -> bool {
        let mut core = self.core.lock();
        if core.is_disposed() {
            return false;
        }

        core.is_navigating = true;
        core.is_internal = true;
        if core.debug_mode {
            tracing::debug!(path = %target, "Initializing navigation history");
        }
        core.emit();
        true
    }

    fn finish_initialize(&self, target: &str, outcome: Result<bool, NavigatorFault>) -> bool {
        let mut core = self.core.lock();
        let error = match outcome {
            Ok(true) => {
                core.confirm(target);
                core.clear_flags();
                core.stack.reset(target);
                core.initialized = true;
                tracing::info!(path = %target, "Navigation history initialized");
                core.emit();
                return true;
            }
            Ok(false) => NavigationError::new(
                NavigationErrorKind::InitializationFailed,
                format!("Navigator rejected initial navigation to {}", target),
            ),
            Err(fault) => NavigationError::new(
                NavigationErrorKind::InitializationFailed,
                format!("Failed to initialize history at {}: {}", target, fault),
            )
            .with_source(fault),
        };

        core.clear_flags();
        core.report(error);
        core.emit();
        false
    }

    // The work futures live in the in-flight slot, which `Inner` owns, so they
    // hold it weakly and never keep it alive across the navigator call.

    async fn run_index_navigation(
        inner: Weak<Inner>,
        navigator: Arc<dyn Navigator>,
        ticket: u64,
        index: usize,
    ) -> bool {
        let begun = inner
            .upgrade()
            .and_then(|inner| inner.begin_index_navigation(index));
        let succeeded = match begun {
            Some((target, previous)) => {
                let outcome = navigator.navigate(&target).await;
                inner.upgrade().is_some_and(|inner| {
                    inner.finish_index_navigation(&target, index, previous, outcome)
                })
            }
            None => false,
        };
        Self::release_weak(&inner, ticket);
        succeeded
    }

    async fn run_initialize(
        inner: Weak<Inner>,
        navigator: Arc<dyn Navigator>,
        ticket: u64,
        target: String,
    ) -> bool {
        let begun = inner
            .upgrade()
            .is_some_and(|inner| inner.begin_initialize(&target));
        let succeeded = if begun {
            let outcome = navigator.navigate(&target).await;
            inner
                .upgrade()
                .is_some_and(|inner| inner.finish_initialize(&target, outcome))
        } else {
            false
        };
        Self::release_weak(&inner, ticket);
        succeeded
    }

    fn release_weak(inner: &Weak<Inner>, ticket: u64) {
        if let Some(inner) = inner.upgrade() {
            inner.release(ticket);
        }
    }
}

/// Browser-like back/forward history over opaque paths.
///
/// Cloning yields another handle to the same history. The observer
/// subscription is released by [`dispose`](Self::dispose) or when the last
/// handle is dropped.
#[derive(Clone)]
pub struct NavigationHistory {
    inner: Arc<Inner>,
}

impl NavigationHistory {
    pub fn new(
        config: HistoryConfig,
        navigator: Arc<dyn Navigator>,
        location: Arc<dyn LocationObserver>,
    ) -> crate::Result<Self> {
        config.validate()?;

        let stack = HistoryStack::new(config.max_history_length);
        let hub = EventHub::new(NavigationState::capture(&stack, false));
        let core = HistoryCore {
            stack,
            is_navigating: false,
            is_internal: false,
            initialized: false,
            last_observed: None,
            debug_mode: config.debug_mode,
            hub: Some(hub),
        };

        let inner = Arc::new(Inner {
            config,
            navigator,
            location,
            core: Mutex::new(core),
            in_flight: Mutex::new(None),
            next_ticket: AtomicU64::new(1),
            subscription: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = inner.location.on_change(Arc::new(move |path: &str| {
            if let Some(inner) = weak.upgrade() {
                inner.observe(path);
            }
        }));
        *inner.subscription.lock() = Some(subscription);

        if inner.config.auto_initialize {
            inner.auto_initialize();
        }

        Ok(Self { inner })
    }

    /// Step one entry back
    pub async fn go_back(&self) -> bool {
        match self.inner.back_target() {
            Some(index) => self.navigate_to_index(index).await,
            None => false,
        }
    }

    /// Step one entry forward
    pub async fn go_forward(&self) -> bool {
        match self.inner.forward_target() {
            Some(index) => self.navigate_to_index(index).await,
            None => false,
        }
    }

    /// Jump to the first entry equal to `path`
    pub async fn navigate_to_path(&self, path: &str) -> bool {
        match self.inner.path_target(path) {
            Some(index) => self.navigate_to_index(index).await,
            None => false,
        }
    }

    /// Jump to the entry at `index`.
    ///
    /// The index is applied before the navigator is called and is kept if the
    /// navigator fails, unless `rollback_on_failure` is configured.
    pub async fn navigate_to_index(&self, index: usize) -> bool {
        if !self.inner.check_index(index) {
            return false;
        }

        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let work = Inner::run_index_navigation(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.navigator),
            ticket,
            index,
        )
        .boxed();
        self.run_exclusive(ticket, work).await
    }

    /// Navigate to `path` (else the observed location, else the default
    /// route) and restart the history from it.
    pub async fn initialize(&self, path: Option<&str>) -> bool {
        if self.is_disposed() {
            return false;
        }

        let target = self.inner.resolve_target(path);
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let work = Inner::run_initialize(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.navigator),
            ticket,
            target,
        )
        .boxed();
        self.run_exclusive(ticket, work).await
    }

    pub async fn reset(&self) -> bool {
        self.initialize(None).await
    }

    async fn run_exclusive(&self, ticket: u64, work: BoxFuture<'static, bool>) -> bool {
        let work = work.shared();
        let mut reported = false;

        while let Some(running) = self.inner.claim(ticket, &work) {
            if !reported {
                self.inner.report_concurrent();
                reported = true;
            }
            running.await;
        }

        work.await
    }

    /// Drop every entry. Navigation flags are left as they are.
    pub fn clear_history(&self) -> bool {
        let mut core = self.inner.core.lock();
        if core.is_disposed() {
            return false;
        }
        core.stack.clear();
        core.emit();
        true
    }

    pub fn current_state(&self) -> NavigationState {
        self.inner.core.lock().snapshot()
    }

    /// Stream of snapshots; a new receiver starts at the latest one.
    pub fn subscribe_state(&self) -> watch::Receiver<NavigationState> {
        let core = self.inner.core.lock();
        match &core.hub {
            Some(hub) => hub.subscribe_state(),
            None => events::closed_state(core.snapshot()),
        }
    }

    /// Stream of error events emitted after subscribing.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<NavigationError> {
        let core = self.inner.core.lock();
        match &core.hub {
            Some(hub) => hub.subscribe_errors(),
            None => events::closed_errors(),
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.inner.core.lock().stack.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.inner.core.lock().stack.can_go_forward()
    }

    pub fn history_length(&self) -> usize {
        self.inner.core.lock().stack.len()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.inner.core.lock().stack.contains(path)
    }

    pub fn path_at(&self, index: usize) -> Option<String> {
        self.inner.core.lock().stack.get(index).map(str::to_string)
    }

    pub fn config(&self) -> HistoryConfig {
        self.inner.config.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.core.lock().initialized
    }

    pub fn is_navigating(&self) -> bool {
        self.inner.core.lock().is_navigating
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.core.lock().is_disposed()
    }

    /// Detach from the observer and complete both event streams.
    pub fn dispose(&self) {
        let subscription = self.inner.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }

        let hub = self.inner.core.lock().hub.take();
        if hub.is_some() {
            tracing::info!("Navigation history disposed");
        }
    }
}

impl std::fmt::Debug for NavigationHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationHistory")
            .field("state", &self.current_state())
            .field("config", &self.inner.config)
            .finish()
    }
}
