//! Configuration for request timing export.

use serde::{Deserialize, Serialize};

use crate::error::{TimersError, TimersResult};
use crate::header::{DEFAULT_SEPARATOR, SERVER_TIMING};
use crate::scope::DEFAULT_SUBTIMER_NAME;

/// Name of the timer that measures a whole request.
pub const DEFAULT_REQUEST_TIMER: &str = "Request";

/// Settings shared by [`TimerService`](crate::TimerService) and
/// [`ResponseTimings`](crate::ResponseTimings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimersConfig {
    /// Response header carrying the export
    pub header_name: String,
    /// Timer started for every request; `None` disables it
    pub request_timer: Option<String>,
    /// Name of the link timer created when a scope is nested
    pub subtimer_name: String,
    /// Separator between header tokens
    pub token_separator: String,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            header_name: SERVER_TIMING.to_string(),
            request_timer: Some(DEFAULT_REQUEST_TIMER.to_string()),
            subtimer_name: DEFAULT_SUBTIMER_NAME.to_string(),
            token_separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl TimersConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response header name.
    pub fn with_header_name(mut self, name: &str) -> Self {
        self.header_name = name.to_string();
        self
    }

    /// Set the request timer name.
    pub fn with_request_timer(mut self, name: &str) -> Self {
        self.request_timer = Some(name.to_string());
        self
    }

    /// Do not create a request timer.
    pub fn without_request_timer(mut self) -> Self {
        self.request_timer = None;
        self
    }

    /// Set the name of the link timer used for nested scopes.
    pub fn with_subtimer_name(mut self, name: &str) -> Self {
        self.subtimer_name = name.to_string();
        self
    }

    /// Set the token separator.
    pub fn with_token_separator(mut self, separator: &str) -> Self {
        self.token_separator = separator.to_string();
        self
    }

    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> TimersResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce a well-formed header.
    pub fn validate(&self) -> TimersResult<()> {
        if self.header_name.trim().is_empty() {
            return Err(TimersError::InvalidConfig("header name is empty".to_string()));
        }
        if !self.token_separator.contains(',') {
            return Err(TimersError::InvalidConfig(format!(
                "token separator {:?} must contain a comma",
                self.token_separator
            )));
        }
        Ok(())
    }
}
