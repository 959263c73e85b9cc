// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Error report throttling
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Each failure class reports once per episode: the latch trips on the
// first failure and only a success of the same kind re-arms it.

/// A one-shot latch for one failure class.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Latch {
    tripped: bool,
}

impl Latch {
    /// Record a failure. Returns `true` if this failure should be reported.
    pub fn trip(&mut self) -> bool {
        !std::mem::replace(&mut self.tripped, true)
    }

    /// Record a success, re-arming the latch.
    pub fn reset(&mut self) {
        self.tripped = false;
    }

    /// Whether a failure episode is in progress.
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}

/// Independent latches for open failures and write failures.
///
/// The latches only gate reporting; they never change what the logger
/// does next.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorThrottle {
    /// Tripped while opening keeps failing.
    pub open: Latch,
    /// Tripped while writing keeps failing.
    pub write: Latch,
}

impl ErrorThrottle {
    /// Fresh throttle with both latches armed.
    pub fn new() -> Self {
        Self::default()
    }
}
