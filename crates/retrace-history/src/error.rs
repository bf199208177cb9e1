//! Navigation error events and configuration errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Fault type a [`Navigator`](crate::Navigator) may return instead of a verdict.
pub type NavigatorFault = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavigationErrorKind {
    /// The navigator rejected the request or faulted
    NavigationFailed,
    /// Out-of-range index, unknown path, or back/forward at a boundary
    InvalidIndex,
    /// The navigator call behind `initialize`/`reset` failed
    InitializationFailed,
    /// A request arrived while another navigation was in flight
    ConcurrentNavigation,
}

impl NavigationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationErrorKind::NavigationFailed => "NAVIGATION_FAILED",
            NavigationErrorKind::InvalidIndex => "INVALID_INDEX",
            NavigationErrorKind::InitializationFailed => "INITIALIZATION_FAILED",
            NavigationErrorKind::ConcurrentNavigation => "CONCURRENT_NAVIGATION",
        }
    }
}

impl std::fmt::Display for NavigationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NavigationErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NAVIGATION_FAILED" => Ok(NavigationErrorKind::NavigationFailed),
            "INVALID_INDEX" => Ok(NavigationErrorKind::InvalidIndex),
            "INITIALIZATION_FAILED" => Ok(NavigationErrorKind::InitializationFailed),
            "CONCURRENT_NAVIGATION" => Ok(NavigationErrorKind::ConcurrentNavigation),
            _ => Err(format!("Unknown navigation error kind: {}", s)),
        }
    }
}

/// An error event published on the history's error stream.
///
/// These never unwind the caller: the triggering operation also returns
/// `false`.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct NavigationError {
    pub kind: NavigationErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Fault reported by the navigator, if any
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl NavigationError {
    pub fn new(kind: NavigationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn with_source(mut self, fault: NavigatorFault) -> Self {
        self.source = Some(Arc::from(fault));
        self
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("maxHistoryLength must be greater than zero")]
    InvalidMaxHistoryLength,

    #[error("defaultRoute cannot be empty")]
    InvalidDefaultRoute,

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
