//! Individual timers.
//!
//! A [`Timer`] is a cheap handle to a named interval measurement stored in a
//! [`TimerSet`]. Handles are created by [`TimerSet::new_timer`] and mutated by
//! whoever holds them; the set keeps its own reference so the measurement can
//! be exported later. Exports work on [`TimerSnapshot`] values, which are plain
//! copies and can be read without further locking.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::set::TimerSet;

// =============================================================================
// Start Mark
// =============================================================================

/// When a timer was started.
///
/// Live timers carry both a monotonic instant (for elapsed time) and a wall
/// clock reading (for export). Timers decoded from the wire only know the
/// wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartMark {
    instant: Option<Instant>,
    wall: DateTime<Utc>,
}

impl StartMark {
    /// Capture the current time.
    pub fn now() -> Self {
        Self {
            instant: Some(Instant::now()),
            wall: Utc::now(),
        }
    }

    /// Rebuild a start mark from an epoch in milliseconds.
    ///
    /// Returns `None` if the epoch is outside the representable range.
    pub fn from_epoch_ms(epoch_ms: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(epoch_ms).single().map(|wall| Self {
            instant: None,
            wall,
        })
    }

    /// Wall clock time of the start.
    pub fn wall(&self) -> DateTime<Utc> {
        self.wall
    }

    /// Start as milliseconds since the Unix epoch.
    pub fn epoch_ms(&self) -> i64 {
        self.wall.timestamp_millis()
    }

    /// Time elapsed since the start.
    ///
    /// Uses the monotonic clock when available, otherwise the wall clock
    /// (clamped at zero).
    pub fn elapsed(&self) -> Duration {
        match self.instant {
            Some(instant) => instant.elapsed(),
            None => (Utc::now() - self.wall).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

// =============================================================================
// Timer Snapshot
// =============================================================================

/// A value copy of a timer, taken at export time.
#[derive(Debug, Clone)]
pub struct TimerSnapshot {
    pub(crate) name: String,
    pub(crate) start: Option<StartMark>,
    pub(crate) duration: Option<Duration>,
    pub(crate) tags: Vec<String>,
    pub(crate) child: Option<Arc<TimerSet>>,
}

impl TimerSnapshot {
    /// Name of the timer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the timer was started, if it was.
    pub fn start(&self) -> Option<StartMark> {
        self.start
    }

    /// Tags in insertion order.
    pub fn tags(&self) -> Vec<String> {
        self.tags.clone()
    }

    /// Child set owned by this timer, if any.
    pub fn child(&self) -> Option<&Arc<TimerSet>> {
        self.child.as_ref()
    }

    /// Copies of the timers in the child set. Empty when there is no child.
    pub fn children(&self) -> Vec<TimerSnapshot> {
        self.child.as_ref().map(|c| c.all()).unwrap_or_default()
    }

    /// True if the timer was started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.duration.is_none()
    }

    /// Recorded duration if stopped, zero if never started, otherwise the
    /// live elapsed time since start.
    pub fn duration(&self) -> Duration {
        match (self.duration, self.start) {
            (Some(d), _) => d,
            (None, None) => Duration::ZERO,
            (None, Some(start)) => start.elapsed(),
        }
    }

    /// Duration in milliseconds, truncated to whole microseconds.
    pub fn milliseconds(&self) -> f64 {
        self.duration().as_micros() as f64 / 1000.0
    }

    /// True if both snapshots describe the exact same measurement.
    pub fn same_as(&self, other: &TimerSnapshot) -> bool {
        self.name == other.name && self.start == other.start && self.duration == other.duration
    }
}

impl fmt::Display for TimerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        match (self.start, self.duration) {
            (None, _) => f.write_str("NotStarted")?,
            (Some(_), None) => f.write_str("Running")?,
            (Some(_), Some(d)) => write!(f, "{:.3}ms", d.as_secs_f64() * 1000.0)?,
        }
        if !self.tags.is_empty() {
            write!(f, " tags:({})", self.tags.join(","))?;
        }
        Ok(())
    }
}

// =============================================================================
// Timer
// =============================================================================

#[derive(Debug, Default)]
struct TimerState {
    start: Option<StartMark>,
    duration: Option<Duration>,
    tags: Vec<String>,
}

#[derive(Debug)]
struct TimerInner {
    name: String,
    child: Option<Arc<TimerSet>>,
    state: Mutex<TimerState>,
}

/// Handle to a timer stored in a [`TimerSet`].
///
/// Cloning the handle is cheap and every clone refers to the same timer.
/// The timer is meant to be driven by a single owner; concurrent use is safe
/// but the last write wins.
///
/// # Example
///
/// ```rust
/// use timers::TimerSet;
///
/// let set = TimerSet::new();
/// let timer = set.new_timer("load config");
/// timer.tag("cold").start();
/// // ... work ...
/// timer.stop();
/// assert!(!timer.is_running());
/// ```
#[derive(Debug, Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl Timer {
    pub(crate) fn new(name: String, child: Option<Arc<TimerSet>>) -> Self {
        Self::from_parts(name, child, TimerState::default())
    }

    pub(crate) fn restored(
        name: String,
        start: Option<StartMark>,
        duration: Option<Duration>,
        tags: Vec<String>,
        child: Option<Arc<TimerSet>>,
    ) -> Self {
        Self::from_parts(
            name,
            child,
            TimerState {
                start,
                duration,
                tags,
            },
        )
    }

    fn from_parts(name: String, child: Option<Arc<TimerSet>>, state: TimerState) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                name,
                child,
                state: Mutex::new(state),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the timer.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Child set owned by this timer, if it was created with one.
    pub fn child(&self) -> Option<&Arc<TimerSet>> {
        self.inner.child.as_ref()
    }

    /// Record now as the start time. Restarting clears an earlier duration.
    pub fn start(&self) -> &Self {
        let mut state = self.state();
        state.start = Some(StartMark::now());
        state.duration = None;
        drop(state);
        self
    }

    /// Record the time elapsed since start as the duration.
    ///
    /// Stopping a timer that was never started records a zero duration and
    /// logs a warning. Stopping twice overwrites the earlier duration.
    pub fn stop(&self) -> &Self {
        let mut state = self.state();
        let elapsed = match state.start {
            Some(start) => start.elapsed(),
            None => {
                tracing::warn!(target: "timers", name = %self.inner.name, "timer stopped before it was started");
                Duration::ZERO
            }
        };
        state.duration = Some(elapsed);
        drop(state);

        tracing::trace!(
            target: "timers",
            name = %self.inner.name,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "timer stopped"
        );
        self
    }

    /// Append a tag. Order is kept and duplicates are allowed.
    pub fn tag(&self, tag: impl Into<String>) -> &Self {
        self.state().tags.push(tag.into());
        self
    }

    /// Copy of the tags.
    pub fn tags(&self) -> Vec<String> {
        self.state().tags.clone()
    }

    /// See [`TimerSnapshot::duration`].
    pub fn duration(&self) -> Duration {
        self.snapshot().duration()
    }

    /// See [`TimerSnapshot::milliseconds`].
    pub fn milliseconds(&self) -> f64 {
        self.snapshot().milliseconds()
    }

    /// True if started and not yet stopped.
    pub fn is_running(&self) -> bool {
        let state = self.state();
        state.start.is_some() && state.duration.is_none()
    }

    /// Copies of the timers in the child set. Empty when there is no child.
    pub fn children(&self) -> Vec<TimerSnapshot> {
        self.child().map(|c| c.all()).unwrap_or_default()
    }

    /// Start the timer, run `f`, then stop the timer.
    ///
    /// The timer is stopped even if `f` panics.
    pub fn measure<R>(&self, f: impl FnOnce() -> R) -> R {
        self.start();
        let _guard = StopOnDrop(self);
        f()
    }

    /// Take a value copy of the timer.
    pub fn snapshot(&self) -> TimerSnapshot {
        let state = self.state();
        TimerSnapshot {
            name: self.inner.name.clone(),
            start: state.start,
            duration: state.duration,
            tags: state.tags.clone(),
            child: self.inner.child.clone(),
        }
    }

    /// True if both handles refer to the same timer.
    pub fn ptr_eq(&self, other: &Timer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.snapshot(), f)
    }
}

/// Stops the referenced timer when dropped, including during unwinding.
pub(crate) struct StopOnDrop<'a>(pub(crate) &'a Timer);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}
