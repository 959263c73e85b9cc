// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Notifications
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The record path never returns errors to its caller. Everything an
// operator needs to know (failures, closures, wraps) is emitted as a
// `LogEvent` through an injected `EventSink`.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FileStatus, SidecarStatus};

/// Something the logger reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    /// A file could not be opened. Reported once per failure episode.
    FileOpenError {
        /// Failure classification.
        status: FileStatus,
        /// The name that could not be opened.
        file_name: String,
    },

    /// A write (or sync) failed. Reported once per failure episode.
    /// Zero byte counts mean the failure happened while syncing.
    FileWriteError {
        /// Failure classification.
        status: FileStatus,
        /// Bytes of the block that did reach the file.
        bytes_written: usize,
        /// Size of the block being written.
        bytes_requested: usize,
        /// The file being written.
        file_name: String,
    },

    /// A file was closed.
    FileClosed {
        /// The closed file.
        file_name: String,
    },

    /// A file was wrapped back to offset 0.
    FileRestarted {
        /// The wrapped file.
        file_name: String,
    },

    /// The record infix was changed (empty means cleared).
    RecordInfixChanged {
        /// The new infix.
        infix: String,
    },

    /// The sidecar of a closed file could not be produced.
    SidecarValidationError {
        /// The primary file.
        file_name: String,
        /// The sidecar that was being written.
        sidecar_name: String,
        /// Failure classification.
        status: SidecarStatus,
    },

    /// A record larger than the whole file budget was discarded.
    RecordDropped {
        /// Framed size of the record.
        bytes: u64,
        /// The configured budget.
        max_file_size: u64,
    },
}

/// Receives notifications from the logger.
pub trait EventSink: Send {
    /// Deliver one notification. Must not call back into the logger.
    fn emit(&mut self, event: LogEvent);
}

/// Renders notifications as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn emit(&mut self, event: LogEvent) {
        match event {
            LogEvent::FileOpenError { status, file_name } => {
                warn!(?status, file = %file_name, "Failed to open log file");
            }
            LogEvent::FileWriteError {
                status,
                bytes_written,
                bytes_requested,
                file_name,
            } => {
                warn!(
                    ?status,
                    bytes_written,
                    bytes_requested,
                    file = %file_name,
                    "Failed to write log file"
                );
            }
            LogEvent::FileClosed { file_name } => {
                info!(file = %file_name, "Closed log file");
            }
            LogEvent::FileRestarted { file_name } => {
                debug!(file = %file_name, "Wrapped log file to offset 0");
            }
            LogEvent::RecordInfixChanged { infix } => {
                info!(infix = %infix, "Record infix changed");
            }
            LogEvent::SidecarValidationError {
                file_name,
                sidecar_name,
                status,
            } => {
                warn!(
                    ?status,
                    file = %file_name,
                    sidecar = %sidecar_name,
                    "Failed to write validation sidecar"
                );
            }
            LogEvent::RecordDropped {
                bytes,
                max_file_size,
            } => {
                warn!(bytes, max_file_size, "Dropped record larger than the file budget");
            }
        }
    }
}

/// Forwards notifications over a channel. A dropped receiver is ignored.
impl EventSink for Sender<LogEvent> {
    fn emit(&mut self, event: LogEvent) {
        let _ = self.send(event);
    }
}
