// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stopwatch for tracking how long groups run.
//!
//! A group records a start time when it is first started, and its duration is measured at
//! session end. For that we use a combination of a `DateTime` (realtime clock, logged when
//! the group starts) and an `Instant` (monotonic clock, for the reported duration).

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart::new()
}

/// The start state of a stopwatch.
#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    fn new() -> Self {
        Self {
            // These two syscalls will happen imperceptibly close to each other, which is good
            // enough for our purposes.
            start_time: Local::now(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    pub(crate) fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            duration: self.instant.elapsed(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StopwatchSnapshot {
    pub(crate) duration: Duration,
}

impl StopwatchSnapshot {
    /// The elapsed time in fractional milliseconds, as reported on the wire.
    pub(crate) fn millis(&self) -> f64 {
        duration_millis(self.duration)
    }
}

/// Converts a duration to fractional milliseconds.
pub(crate) fn duration_millis(duration: Duration) -> f64 {
    // Nanosecond counts in a session are far below 2^53, so the conversion is exact.
    duration.as_nanos() as f64 / 1_000_000.0
}
