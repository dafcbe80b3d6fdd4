//! Wire tree codec.
//!
//! A timer set is exported as a JSON list of records:
//!
//! ```json
//! [{"name": "Request", "start": 1700000000123, "duration": 12.5,
//!   "tags": ["cached"], "children": [{"name": "db", "start": 0, "duration": 0}]}]
//! ```
//!
//! `start` is epoch milliseconds (0 when never started) and `duration` is
//! milliseconds with microsecond precision. `tags` is omitted when empty and
//! `children` is omitted for timers without a child set. These field names
//! are read by external tools and must not change.
//!
//! Decoding yields a detached forest. Durations only survive to the
//! microsecond, and a decoded duration of exactly zero becomes 1ns so that a
//! legitimately instant timer still reads as stopped. Missing `name`, `start`
//! or `duration` fields decode as empty, never started and zero.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{TimersError, TimersResult};
use crate::set::TimerSet;
use crate::timer::{StartMark, Timer, TimerSnapshot};

/// Duration given to decoded timers whose wire duration is zero.
pub const ZERO_DURATION_STANDIN: Duration = Duration::from_nanos(1);

/// One timer in the wire tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTimer {
    /// Timer name
    #[serde(default)]
    pub name: String,
    /// Start as epoch milliseconds, 0 if never started
    #[serde(default)]
    pub start: i64,
    /// Duration in milliseconds
    #[serde(default)]
    pub duration: f64,
    /// Tags, omitted when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Child timers, omitted when the timer has no child set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WireTimer>>,
}

impl From<&TimerSnapshot> for WireTimer {
    fn from(timer: &TimerSnapshot) -> Self {
        let tags = timer.tags();
        Self {
            name: timer.name().to_string(),
            start: timer.start().map(|s| s.epoch_ms()).unwrap_or(0),
            duration: timer.milliseconds(),
            tags: (!tags.is_empty()).then_some(tags),
            children: timer.child().map(|c| encode(c)),
        }
    }
}

/// Encode the timers of `set`, recursively.
pub fn encode(set: &TimerSet) -> Vec<WireTimer> {
    set.all().iter().map(WireTimer::from).collect()
}

/// Rebuild a detached timer set from wire records.
///
/// The whole tree is validated; on error nothing is returned.
pub fn decode(records: &[WireTimer]) -> TimersResult<TimerSet> {
    let timers = records.iter().map(decode_timer).collect::<TimersResult<Vec<_>>>()?;
    Ok(TimerSet::from_timers(timers))
}

fn decode_timer(record: &WireTimer) -> TimersResult<Timer> {
    let invalid = |reason: String| TimersError::InvalidTimer {
        name: record.name.clone(),
        reason,
    };

    let start = match record.start {
        0 => None,
        epoch_ms => Some(
            StartMark::from_epoch_ms(epoch_ms)
                .ok_or_else(|| invalid(format!("start {epoch_ms} is out of range")))?,
        ),
    };

    let duration = decode_duration(record.duration).ok_or_else(|| {
        invalid(format!(
            "duration {} is not a representable millisecond value",
            record.duration
        ))
    })?;

    let child = match &record.children {
        Some(children) => Some(Arc::new(decode(children)?)),
        None => None,
    };

    Ok(Timer::restored(
        record.name.clone(),
        start,
        Some(duration),
        record.tags.clone().unwrap_or_default(),
        child,
    ))
}

impl TryFrom<&WireTimer> for Timer {
    type Error = TimersError;

    fn try_from(record: &WireTimer) -> TimersResult<Self> {
        decode_timer(record)
    }
}

fn decode_duration(ms: f64) -> Option<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    if ms == 0.0 {
        return Some(ZERO_DURATION_STANDIN);
    }
    let nanos = (ms * 1_000_000.0).round();
    if nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos as u64))
}

impl TimerSet {
    /// Wire records for this set.
    pub fn to_wire(&self) -> Vec<WireTimer> {
        encode(self)
    }

    /// Rebuild a detached set from wire records.
    pub fn from_wire(records: &[WireTimer]) -> TimersResult<Self> {
        decode(records)
    }

    /// Serialize this set as a compact JSON wire tree.
    pub fn to_json(&self) -> TimersResult<String> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }

    /// Serialize this set as an indented JSON wire tree.
    pub fn to_json_pretty(&self) -> TimersResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_wire())?)
    }

    /// Parse a JSON wire tree into a detached set.
    pub fn from_json(json: &str) -> TimersResult<Self> {
        let records: Vec<WireTimer> = serde_json::from_str(json)?;
        decode(&records)
    }
}

impl Timer {
    /// Serialize this timer and its subtree as a single JSON wire record.
    pub fn to_json(&self) -> TimersResult<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Parse a single JSON wire record into a detached timer.
    pub fn from_json(json: &str) -> TimersResult<Self> {
        let record: WireTimer = serde_json::from_str(json)?;
        Timer::try_from(&record)
    }
}

impl Serialize for TimerSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimerSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Vec::<WireTimer>::deserialize(deserializer)?;
        decode(&records).map_err(serde::de::Error::custom)
    }
}

impl Serialize for TimerSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        WireTimer::from(self).serialize(serializer)
    }
}

// =============================================================================
// Tests
// =============================================================================
