//! Application-wide timer collection.
//!
//! [`TimerService`] is built once at startup and passed to whatever needs it.
//! It owns a root set for timers that do not belong to a request and acts as
//! the parent for per-request timing.

use std::sync::Arc;

use crate::config::TimersConfig;
use crate::error::TimersResult;
use crate::response::ResponseTimings;
use crate::scope::{Scope, TimerScope};
use crate::set::TimerSet;
use crate::timer::Timer;

/// Explicitly constructed owner of a root timer set.
///
/// # Example
///
/// ```rust
/// use timers::{TimerService, TimersConfig, TimerScope};
///
/// let service = TimerService::new(TimersConfig::default()).unwrap();
/// service.new_timer("startup").measure(|| {
///     // ... load things ...
/// });
///
/// let (scope, timings) = service.begin_request();
/// scope.timers().new_timer("handler").start().stop();
/// let report = timings.finish();
/// assert!(report.header.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct TimerService {
    root: Arc<TimerSet>,
    config: TimersConfig,
    link_requests: bool,
}

impl TimerService {
    /// Create a service after validating `config`.
    ///
    /// Requests are not linked into the root set, so a long-running service
    /// does not accumulate per-request timers.
    pub fn new(config: TimersConfig) -> TimersResult<Self> {
        config.validate()?;
        Ok(Self {
            root: TimerSet::shared(),
            config,
            link_requests: false,
        })
    }

    /// Keep every request's timers under the root set.
    pub fn with_linked_requests(mut self) -> Self {
        self.link_requests = true;
        self
    }

    /// The service configuration.
    pub fn config(&self) -> &TimersConfig {
        &self.config
    }

    /// The root set.
    pub fn root(&self) -> &Arc<TimerSet> {
        &self.root
    }

    /// A scope bound to the root set.
    pub fn scope(&self) -> Scope {
        Scope::with_set(Arc::clone(&self.root))
    }

    /// Add a timer to the root set.
    pub fn new_timer(&self, name: impl Into<String>) -> Timer {
        self.root.new_timer(name)
    }

    /// Derive a nested scope from the root, linked by a timer carrying the
    /// configured subtimer name.
    pub fn nest(&self) -> Scope {
        self.scope()
            .nest_with_timer(self.config.subtimer_name.as_str())
            .0
    }

    /// Start timing a request.
    pub fn begin_request(&self) -> (Scope, ResponseTimings) {
        let parent = if self.link_requests {
            self.scope()
        } else {
            Scope::background()
        };
        ResponseTimings::begin(&parent, &self.config)
    }

    /// Server-Timing value of everything under the root set.
    pub fn header_value(&self) -> String {
        crate::header::format_header_with(&self.root.all_deep(), &self.config.token_separator)
    }

    /// JSON wire tree of everything under the root set.
    pub fn export_json(&self) -> TimersResult<String> {
        self.root.to_json()
    }
}
