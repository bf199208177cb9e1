//! Retrace Navigation History
//!
//! Browser-like back/forward navigation over opaque paths, independent of the
//! router that actually performs navigation:
//! - bounded history stack with forward-branch truncation and eviction
//! - internal (requested here) vs external (observed) navigation
//! - one navigator call in flight at a time, later requests queued behind it
//! - state snapshots and error events as streams

mod config;
mod error;
mod events;
mod history;
mod location;
mod stack;
mod state;

/// Re-exported so hosts can implement [`Navigator`] without their own dependency.
pub use async_trait::async_trait;
pub use config::{HistoryConfig, DEFAULT_MAX_HISTORY_LENGTH, DEFAULT_ROUTE};
pub use error::{ConfigError, NavigationError, NavigationErrorKind, NavigatorFault};
pub use history::NavigationHistory;
pub use location::{CurrentLocation, LocationListener, LocationObserver, Navigator, Subscription};
pub use stack::HistoryStack;
pub use state::NavigationState;

pub type Result<T> = std::result::Result<T, ConfigError>;
