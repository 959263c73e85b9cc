// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Time source
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File names in rotate mode embed the time at which the file was opened.
// The time source is injected so names are reproducible under test.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Which clock a timestamp was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u16)]
pub enum TimeBase {
    /// No particular time base (simulated or unset time).
    #[default]
    None = 0,
    /// Processor/mission elapsed time.
    Processor = 1,
    /// Host wall-clock time.
    Workstation = 2,
}

impl TimeBase {
    /// Numeric code used in file names.
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// A point in time, split the way file names print it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamp {
    /// Clock the reading came from.
    pub time_base: TimeBase,
    /// Whole seconds.
    pub seconds: u32,
    /// Microseconds past `seconds`.
    pub microseconds: u32,
}

impl Timestamp {
    /// Build a timestamp.
    pub const fn new(time_base: TimeBase, seconds: u32, microseconds: u32) -> Self {
        Self {
            time_base,
            seconds,
            microseconds,
        }
    }
}

/// Source of the current time.
pub trait Clock: Send {
    /// Read the clock.
    fn now(&self) -> Timestamp;
}

/// Host wall clock (UTC), reported with the `Workstation` time base.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = Utc::now();
        Timestamp {
            time_base: TimeBase::Workstation,
            seconds: now.timestamp().clamp(0, i64::from(u32::MAX)) as u32,
            // Leap seconds report up to 1_999_999.
            microseconds: now.timestamp_subsec_micros().min(999_999),
        }
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so a test can keep one handle and give
/// another to the controller.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    reading: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            reading: Arc::new(Mutex::new(start)),
        }
    }

    /// Replace the current reading.
    pub fn set(&self, timestamp: Timestamp) {
        *self.reading.lock().unwrap_or_else(PoisonError::into_inner) = timestamp;
    }

    /// Move the reading forward by whole seconds.
    pub fn advance_seconds(&self, seconds: u32) {
        let mut reading = self.reading.lock().unwrap_or_else(PoisonError::into_inner);
        reading.seconds = reading.seconds.saturating_add(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.reading.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
