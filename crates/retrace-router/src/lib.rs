//! Retrace Router
//!
//! In-memory location host for `retrace-history`. It owns the current
//! location, performs navigations and notifies listeners, so a
//! [`NavigationHistory`] can run without a real routing framework.

mod error;
mod router;

pub use error::RouterError;
pub use router::{MemoryRouter, RouteRule};

pub use retrace_history::{HistoryConfig, NavigationHistory};

/// Initialize logging
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
