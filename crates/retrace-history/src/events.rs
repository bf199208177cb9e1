//! State and error streams
//!
//! State uses a watch channel so late subscribers see the latest snapshot
//! immediately. Errors use a broadcast channel and are never replayed.

use tokio::sync::{broadcast, watch};

use crate::error::NavigationError;
use crate::state::NavigationState;

const ERROR_CHANNEL_CAPACITY: usize = 64;

pub(crate) struct EventHub {
    state: watch::Sender<NavigationState>,
    errors: broadcast::Sender<NavigationError>,
}

impl EventHub {
    pub(crate) fn new(initial: NavigationState) -> Self {
        let (state, _) = watch::channel(initial);
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self { state, errors }
    }

    pub(crate) fn publish_state(&self, snapshot: NavigationState) {
        self.state.send_replace(snapshot);
    }

    pub(crate) fn publish_error(&self, error: NavigationError) {
        // No receivers is not a failure.
        let _ = self.errors.send(error);
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<NavigationState> {
        self.state.subscribe()
    }

    pub(crate) fn subscribe_errors(&self) -> broadcast::Receiver<NavigationError> {
        self.errors.subscribe()
    }
}

/// Receiver over a stream that has already completed, holding `last`.
pub(crate) fn closed_state(last: NavigationState) -> watch::Receiver<NavigationState> {
    let (_, rx) = watch::channel(last);
    rx
}

pub(crate) fn closed_errors() -> broadcast::Receiver<NavigationError> {
    let (_, rx) = broadcast::channel(1);
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NavigationErrorKind;

    #[test]
    fn test_late_state_subscriber_sees_latest() {
        let hub = EventHub::new(NavigationState::default());
        hub.publish_state(NavigationState {
            history_length: 3,
            ..Default::default()
        });

        let rx = hub.subscribe_state();
        assert_eq!(rx.borrow().history_length, 3);
    }

    #[test]
    fn test_errors_are_not_replayed() {
        let hub = EventHub::new(NavigationState::default());
        hub.publish_error(NavigationError::new(NavigationErrorKind::InvalidIndex, "early"));

        let mut rx = hub.subscribe_errors();
        assert!(rx.try_recv().is_err());

        hub.publish_error(NavigationError::new(NavigationErrorKind::InvalidIndex, "late"));
        assert_eq!(rx.try_recv().unwrap().message, "late");
    }

    #[test]
    fn test_closed_receivers() {
        let rx = closed_state(NavigationState::default());
        assert!(rx.has_changed().is_err());

        let mut errors = closed_errors();
        assert!(matches!(
            errors.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ));
    }
}
