//! Response-boundary export.
//!
//! HTTP integrations need the timing header exactly once, before the first
//! byte of the response goes out. [`ResponseTimings`] holds the request's
//! timer set and hands out the header on the first of "status written",
//! "body written", an explicit export, or the end of the handler. Later calls
//! return nothing, since the header could no longer be sent.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::TimersConfig;
use crate::header::format_header_with;
use crate::scope::TimerScope;
use crate::set::TimerSet;
use crate::timer::Timer;

/// What caused an export attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTrigger {
    /// The response status is about to be written
    WriteHeader,
    /// The first body bytes are about to be written
    WriteBody,
    /// Application code asked for the header
    Explicit,
    /// The handler returned without writing anything
    Finish,
}

impl fmt::Display for ExportTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportTrigger::WriteHeader => "write_header",
            ExportTrigger::WriteBody => "write_body",
            ExportTrigger::Explicit => "explicit",
            ExportTrigger::Finish => "finish",
        };
        f.write_str(s)
    }
}

/// A header name and value ready to be attached to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingHeader {
    pub name: String,
    pub value: String,
}

/// Outcome of a finished request.
#[derive(Debug)]
pub struct ResponseReport {
    /// Header, if it had not been exported before the handler finished
    pub header: Option<TimingHeader>,
    /// Every timer recorded for the request
    pub timers: Arc<TimerSet>,
}

/// Per-request export guard.
///
/// # Example
///
/// ```rust
/// use timers::{ResponseTimings, Scope, TimerScope, TimersConfig};
///
/// let (scope, timings) = ResponseTimings::begin(&Scope::background(), &TimersConfig::default());
/// scope.timers().new_timer("handler").start().stop();
///
/// let header = timings.on_write_header().unwrap();
/// assert_eq!(header.name, "Server-Timing");
/// assert!(header.value.contains("descr=\"handler\""));
/// assert!(timings.on_write_body().is_none());
/// ```
#[derive(Debug)]
pub struct ResponseTimings {
    timers: Arc<TimerSet>,
    request_timer: Option<Timer>,
    header_name: String,
    separator: String,
    exported: AtomicBool,
}

impl ResponseTimings {
    /// Start timing a request.
    ///
    /// The request gets a new set, linked into `parent`'s set (if any) under
    /// the configured subtimer name. The returned scope is bound to the new
    /// set and should be handed to the request handler. If configured, a
    /// request timer is created in the new set and started.
    pub fn begin<S: TimerScope>(parent: &S, config: &TimersConfig) -> (S, Self) {
        let (scope, _link) = parent.nest_with_timer(config.subtimer_name.as_str());
        let timers = scope.timers();
        let request_timer = config.request_timer.as_ref().map(|name| {
            let timer = timers.new_timer(name.as_str());
            timer.start();
            timer
        });

        let timings = Self {
            timers,
            request_timer,
            header_name: config.header_name.clone(),
            separator: config.token_separator.clone(),
            exported: AtomicBool::new(false),
        };
        (scope, timings)
    }

    /// The request's timer set.
    pub fn timers(&self) -> &Arc<TimerSet> {
        &self.timers
    }

    /// True once the header has been handed out.
    pub fn is_exported(&self) -> bool {
        self.exported.load(Ordering::Acquire)
    }

    /// Export on the first call only; stops the request timer first.
    pub fn export(&self, trigger: ExportTrigger) -> Option<TimingHeader> {
        if self.exported.swap(true, Ordering::AcqRel) {
            tracing::debug!(target: "timers", %trigger, "timing header already exported");
            return None;
        }

        if let Some(timer) = &self.request_timer {
            timer.stop();
        }
        let entries = self.timers.all_deep();
        tracing::debug!(target: "timers", %trigger, timers = entries.len(), "exporting timing header");

        Some(TimingHeader {
            name: self.header_name.clone(),
            value: format_header_with(&entries, &self.separator),
        })
    }

    /// Hook for "status about to be written".
    pub fn on_write_header(&self) -> Option<TimingHeader> {
        self.export(ExportTrigger::WriteHeader)
    }

    /// Hook for "body bytes about to be written".
    pub fn on_write_body(&self) -> Option<TimingHeader> {
        self.export(ExportTrigger::WriteBody)
    }

    /// Close out the request.
    ///
    /// The header is included only if no earlier hook exported it.
    pub fn finish(self) -> ResponseReport {
        let header = self.export(ExportTrigger::Finish);
        ResponseReport {
            header,
            timers: self.timers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    #[test]
    fn test_request_timer_started() {
        let (_, timings) = ResponseTimings::begin(&Scope::background(), &TimersConfig::default());
        let request = timings.timers().find("Request").unwrap();
        assert!(request.is_running());
    }

    #[test]
    fn test_exports_once() {
        let (scope, timings) = ResponseTimings::begin(&Scope::background(), &TimersConfig::default());
        scope.timers().new_timer("test").start().stop();

        let header = timings.on_write_body().unwrap();
        assert!(header.value.contains("descr=\"test\""));
        assert!(header.value.contains("descr=\"Request\""));
        assert!(timings.is_exported());

        assert!(timings.on_write_header().is_none());
        assert!(timings.export(ExportTrigger::Explicit).is_none());
        let report = timings.finish();
        assert!(report.header.is_none());
        assert!(!report.timers.find("Request").unwrap().is_running());
    }

    #[test]
    fn test_finish_exports_when_nothing_written() {
        let (scope, timings) = ResponseTimings::begin(&Scope::background(), &TimersConfig::default());
        scope.timers().new_timer("quiet");

        let report = timings.finish();
        let header = report.header.unwrap();
        assert_eq!(header.name, "Server-Timing");
        assert!(header.value.contains("descr=\"quiet\""));
    }

    #[test]
    fn test_without_request_timer() {
        let config = TimersConfig::new().without_request_timer().with_header_name("X-Timing");
        let (scope, timings) = ResponseTimings::begin(&Scope::background(), &config);
        scope.timers().new_timer("only");

        let header = timings.on_write_header().unwrap();
        assert_eq!(header.name, "X-Timing");
        assert_eq!(header.value, r#"only;descr="only";dur=0;parent=0;id=1"#);
    }

    #[test]
    fn test_links_into_parent_scope() {
        let parent = Scope::with_new_set();
        let (_, timings) = ResponseTimings::begin(&parent, &TimersConfig::default());
        timings.finish();

        let link = parent.timers().find("Subtimer").unwrap();
        assert_eq!(link.children()[0].name(), "Request");
    }

    #[test]
    fn test_concurrent_hooks_export_once() {
        let (_, timings) = ResponseTimings::begin(&Scope::background(), &TimersConfig::default());
        let exported = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| timings.on_write_body().is_some()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|exported| *exported)
                .count()
        });
        assert_eq!(exported, 1);
    }
}
