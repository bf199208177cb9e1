//! History configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::Result;

pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 50;
pub const DEFAULT_ROUTE: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Upper bound on stored entries; oldest entries are evicted first
    pub max_history_length: usize,
    /// Log every state transition at debug level
    pub debug_mode: bool,
    /// Seed the history from the observed location at construction
    pub auto_initialize: bool,
    /// Fallback target for `initialize`/`reset` when nothing is observed
    pub default_route: String,
    /// Restore the previous index when the navigator fails
    pub rollback_on_failure: bool,
}

impl HistoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) JSON document; omitted fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_history_length == 0 {
            return Err(ConfigError::InvalidMaxHistoryLength);
        }
        if self.default_route.is_empty() {
            return Err(ConfigError::InvalidDefaultRoute);
        }
        Ok(())
    }

    pub fn with_max_history_length(mut self, max: usize) -> Self {
        self.max_history_length = max;
        self
    }

    pub fn with_debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    pub fn with_auto_initialize(mut self, enabled: bool) -> Self {
        self.auto_initialize = enabled;
        self
    }

    pub fn with_default_route(mut self, route: impl Into<String>) -> Self {
        self.default_route = route.into();
        self
    }

    pub fn with_rollback_on_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_length: DEFAULT_MAX_HISTORY_LENGTH,
            debug_mode: false,
            auto_initialize: true,
            default_route: DEFAULT_ROUTE.to_string(),
            rollback_on_failure: false,
        }
    }
}
