//! Timer sets.
//!
//! A [`TimerSet`] is one node of the timing tree: a lock-guarded, append-only
//! list of timers. Timers that own a child set link the nodes into a forest.
//! Each set has its own lock, so disjoint subtrees can be mutated
//! concurrently without contention.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::scope::TimerScope;
use crate::timer::{StopOnDrop, Timer, TimerSnapshot};
use crate::tree::{self, FlatTimer};

/// A thread-safe, insertion-ordered collection of timers.
///
/// # Example
///
/// ```rust
/// use timers::TimerSet;
///
/// let set = TimerSet::new();
/// set.new_timer("first").start().stop();
/// set.new_timer("second");
///
/// let names: Vec<_> = set.all().iter().map(|t| t.name().to_string()).collect();
/// assert_eq!(names, ["first", "second"]);
/// ```
#[derive(Debug, Default)]
pub struct TimerSet {
    timers: Mutex<Vec<Timer>>,
}

impl TimerSet {
    /// Create an empty, unattached set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set behind an `Arc`, ready to be bound to a scope.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub(crate) fn from_timers(timers: Vec<Timer>) -> Self {
        Self {
            timers: Mutex::new(timers),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Timer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, timer: Timer) -> Timer {
        self.lock().push(timer.clone());
        timer
    }

    /// Append a new, unstarted timer and return a handle to it.
    ///
    /// Use [`new_timer!`](crate::new_timer) for a formatted name.
    pub fn new_timer(&self, name: impl Into<String>) -> Timer {
        self.push(Timer::new(name.into(), None))
    }

    /// Append a new timer that owns a fresh child set.
    ///
    /// The child set is created together with the timer and never replaced.
    pub fn new_parent_timer(&self, name: impl Into<String>) -> (Timer, Arc<TimerSet>) {
        let child = TimerSet::shared();
        let timer = self.push(Timer::new(name.into(), Some(Arc::clone(&child))));
        (timer, child)
    }

    /// First timer with exactly this name, if any. Names need not be unique.
    pub fn find(&self, name: &str) -> Option<Timer> {
        self.lock().iter().find(|t| t.name() == name).cloned()
    }

    /// Number of timers directly in this set.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no timers have been added to this set.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Handles to the timers directly in this set, in insertion order.
    pub(crate) fn handles(&self) -> Vec<Timer> {
        self.lock().clone()
    }

    /// Value copies of the timers directly in this set, in insertion order.
    ///
    /// Child sets are not descended into.
    pub fn all(&self) -> Vec<TimerSnapshot> {
        // Copy the handles under the set lock, then snapshot each timer
        // without holding it.
        self.handles().iter().map(Timer::snapshot).collect()
    }

    /// Depth-first, pre-order copies of every timer in this subtree, with
    /// export ids assigned. See [`crate::tree`].
    pub fn all_deep(&self) -> Vec<FlatTimer> {
        tree::flatten(self)
    }

    /// Walk the subtree depth-first in pre-order.
    ///
    /// The callback receives a copy of each timer, its depth (0 for timers in
    /// this set) and the set that owns the set the timer lives in (`None` for
    /// timers in this set).
    pub fn tree<F>(&self, visit: F)
    where
        F: FnMut(&TimerSnapshot, usize, Option<&TimerSet>),
    {
        tree::walk(self, visit)
    }

    /// Time `f` under a new timer named `name` whose child set is bound to the
    /// scope handed to `f`.
    ///
    /// Every timer `f` creates through that scope becomes a descendant of the
    /// wrapping timer. The wrapping timer is stopped when `f` returns or
    /// panics.
    pub fn wrap<S, R, F>(&self, scope: &S, name: impl Into<String>, f: F) -> R
    where
        S: TimerScope,
        F: FnOnce(S) -> R,
    {
        let (timer, child) = self.new_parent_timer(name);
        let derived = scope.bind(child);

        tracing::debug!(target: "timers", name = %timer.name(), "entering wrapped operation");
        timer.start();
        let result = {
            let _guard = StopOnDrop(&timer);
            f(derived)
        };
        tracing::debug!(
            target: "timers",
            name = %timer.name(),
            elapsed_ms = timer.milliseconds(),
            "left wrapped operation"
        );
        result
    }

    /// Server-Timing header value for this subtree.
    pub fn server_timing(&self) -> String {
        crate::header::format_header(&self.all_deep())
    }
}

impl fmt::Display for TimerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.all_deep().iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", entry.timer)?;
        }
        Ok(())
    }
}

/// Add a timer with a formatted name to a [`TimerSet`].
///
/// # Example
///
/// ```rust
/// use timers::{new_timer, TimerSet};
///
/// let set = TimerSet::new();
/// let shard = 3;
/// let timer = new_timer!(set, "fetch shard {}", shard);
/// assert_eq!(timer.name(), "fetch shard 3");
/// ```
#[macro_export]
macro_rules! new_timer {
    ($set:expr, $($arg:tt)+) => {
        $set.new_timer(::std::format!($($arg)+))
    };
}
