//! Scope propagation.
//!
//! Timer sets travel through a call graph inside a scope value that callers
//! pass explicitly. [`TimerScope`] is the seam: any request-context type can
//! implement `bind`/`lookup` and gets the fallback accessor for free.
//! [`Scope`] is the plain implementation used when no framework context is
//! available.

use std::sync::Arc;

use crate::set::TimerSet;
use crate::timer::Timer;

/// Name of the link timer created by [`Scope::nest`].
pub const DEFAULT_SUBTIMER_NAME: &str = "Subtimer";

/// A scope value that can carry a [`TimerSet`].
pub trait TimerScope: Sized {
    /// Derive a new scope with `set` bound to it.
    fn bind(&self, set: Arc<TimerSet>) -> Self;

    /// The set bound to this scope, if any.
    fn lookup(&self) -> Option<Arc<TimerSet>>;

    /// The set bound to this scope, or a fresh unattached set on a miss.
    ///
    /// Timers recorded into the fallback set are measured as usual but are
    /// not reachable from any tree.
    fn timers(&self) -> Arc<TimerSet> {
        self.lookup().unwrap_or_else(TimerSet::shared)
    }

    /// Derive a scope with a new child set, linked under a timer named `name`
    /// in the current set. The link timer is returned unstarted.
    ///
    /// If this scope has no set, the link timer is floating.
    fn nest_with_timer(&self, name: impl Into<String>) -> (Self, Timer) {
        let (timer, child) = self.timers().new_parent_timer(name);
        (self.bind(child), timer)
    }

    /// Like [`nest_with_timer`](Self::nest_with_timer) with the link timer
    /// named [`DEFAULT_SUBTIMER_NAME`].
    fn nest(&self) -> Self {
        self.nest_with_timer(DEFAULT_SUBTIMER_NAME).0
    }
}

/// Explicit scope handle threaded through calls.
///
/// Cloning is cheap; clones share the bound set.
///
/// # Example
///
/// ```rust
/// use timers::{Scope, TimerScope};
///
/// let scope = Scope::with_new_set();
/// scope.timers().new_timer("parse").start().stop();
///
/// let (inner, link) = scope.nest_with_timer("render");
/// link.measure(|| {
///     inner.timers().new_timer("layout").start().stop();
/// });
///
/// assert_eq!(scope.timers().all_deep().len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scope {
    timers: Option<Arc<TimerSet>>,
}

impl Scope {
    /// A scope with no set bound.
    pub fn background() -> Self {
        Self::default()
    }

    /// A scope bound to a new, empty root set.
    pub fn with_new_set() -> Self {
        Self {
            timers: Some(TimerSet::shared()),
        }
    }

    /// A scope bound to `set`.
    pub fn with_set(set: Arc<TimerSet>) -> Self {
        Self { timers: Some(set) }
    }
}

impl TimerScope for Scope {
    fn bind(&self, set: Arc<TimerSet>) -> Self {
        Self::with_set(set)
    }

    fn lookup(&self) -> Option<Arc<TimerSet>> {
        self.timers.clone()
    }
}
