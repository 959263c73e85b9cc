// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Log controller
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `LogController` is the logger's state machine. It holds the logging
// mode, owns at most one `FileSession`, and routes buffers and operator
// commands. Calls are expected one at a time from a single dispatcher, so
// there is no locking here; `submit` absorbs every failure and reports it
// through the event sink.

use std::path::Path;

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::{LoggerConfig, RotationPolicy};
use crate::error::{ComlogResult, FileStatus};
use crate::event::{EventSink, LogEvent, TracingEvents};
use crate::frame::{record_size, MAX_PAYLOAD_SIZE};
use crate::naming::FileNamer;
use crate::session::{CloseReport, FileSession, WriteFailure};
use crate::sidecar::{DigestValidator, Validator};
use crate::storage::{FsStorage, LogStorage};
use crate::throttle::ErrorThrottle;

// ---------------------------------------------------------------------------
// Modes and commands
// ---------------------------------------------------------------------------

/// Whether new files may be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// Records are written; files are opened as needed.
    Started,
    /// Records are dropped; no file is open.
    Stopped,
}

/// Whether a file handle is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// No file is open.
    Closed,
    /// A file is open for writing.
    Open,
}

/// An operator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Allow files to be opened again.
    StartLogging,
    /// Close the current file and stop opening new ones.
    StopLogging,
    /// Close the current file; the next record opens a new one.
    CloseFile,
    /// Set (or clear, with an empty string) the record infix.
    SetRecordInfix(String),
}

// ---------------------------------------------------------------------------
// LogController
// ---------------------------------------------------------------------------

/// Streams records into size-bounded, rotating log files.
pub struct LogController {
    /// Validated configuration; fixed for the controller's life.
    config: LoggerConfig,

    /// Builds file names from prefix, infix and clock.
    namer: FileNamer,

    /// Whether files may be opened.
    logging_mode: LoggingMode,

    /// The open file, if any.
    session: Option<FileSession>,

    /// Report-once latches for open and write failures.
    throttle: ErrorThrottle,

    clock: Box<dyn Clock>,
    storage: Box<dyn LogStorage>,
    validator: Option<Box<dyn Validator>>,
    events: Box<dyn EventSink>,
}

impl LogController {
    /// Build a controller. The configuration is validated here; an invalid
    /// one is rejected and no controller exists.
    ///
    /// The controller starts in `LoggingMode::Started` with no file open,
    /// using the system clock, the real file system, a sidecar validator
    /// per `config.sidecar`, and `tracing` for notifications.
    pub fn new(config: LoggerConfig) -> ComlogResult<Self> {
        config.validate()?;
        let validator = config
            .sidecar
            .map(|algorithm| Box::new(DigestValidator::new(algorithm)) as Box<dyn Validator>);

        Ok(Self {
            namer: FileNamer::new(&config),
            config,
            logging_mode: LoggingMode::Started,
            session: None,
            throttle: ErrorThrottle::new(),
            clock: Box::new(SystemClock),
            storage: Box::new(FsStorage),
            validator,
            events: Box::new(TracingEvents),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the file system.
    pub fn with_storage(mut self, storage: impl LogStorage + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    /// Replace the sidecar validator (`None` disables sidecars).
    pub fn with_validator(mut self, validator: Option<Box<dyn Validator>>) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the notification sink.
    pub fn with_events(mut self, events: impl EventSink + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    // -----------------------------------------------------------------------
    // Record path
    // -----------------------------------------------------------------------

    /// Log one buffer.
    ///
    /// If the record would push the open file past its budget, the file is
    /// rotated or wrapped first. If no file is open and logging is started,
    /// one is opened. The record is then framed and written. While logging
    /// is stopped the buffer is dropped silently; when the open fails it is
    /// dropped too. Failures are reported through the event sink, never
    /// returned.
    ///
    /// # Panics
    ///
    /// Panics if `payload` is longer than [`MAX_PAYLOAD_SIZE`] bytes.
    pub fn submit(&mut self, payload: &[u8]) {
        assert!(
            payload.len() <= MAX_PAYLOAD_SIZE,
            "payload of {} bytes exceeds the {MAX_PAYLOAD_SIZE}-byte record limit",
            payload.len()
        );

        // Stopping always closes the file, so there is nothing to write to.
        if self.logging_mode == LoggingMode::Stopped {
            return;
        }

        let record_len = record_size(self.config.metadata, payload.len());
        if record_len > self.config.max_file_size {
            self.events.emit(LogEvent::RecordDropped {
                bytes: record_len,
                max_file_size: self.config.max_file_size,
            });
            return;
        }

        let overflow = self
            .session
            .as_ref()
            .is_some_and(|session| session.would_overflow(record_len, self.config.max_file_size));
        if overflow {
            self.roll_over();
        }

        if self.session.is_none() {
            self.open_file();
        }

        self.write_payload(payload);
    }

    // -----------------------------------------------------------------------
    // Operator actions
    // -----------------------------------------------------------------------

    /// Execute an operator command. `Ok(())` is the success acknowledgment.
    pub fn execute(&mut self, command: Command) -> ComlogResult<()> {
        match command {
            Command::StartLogging => self.set_logging_enabled(true),
            Command::StopLogging => self.set_logging_enabled(false),
            Command::CloseFile => self.force_close(),
            Command::SetRecordInfix(infix) => return self.set_record_infix(&infix),
        }
        Ok(())
    }

    /// Start or stop logging. Stopping closes the open file (writing its
    /// sidecar) and prevents new opens until logging is started again.
    pub fn set_logging_enabled(&mut self, enabled: bool) {
        if enabled {
            self.logging_mode = LoggingMode::Started;
        } else {
            self.logging_mode = LoggingMode::Stopped;
            self.close_file();
        }
        debug!(mode = ?self.logging_mode, "Logging mode set");
    }

    /// Set the infix used for files opened from now on. The open file, if
    /// any, keeps its name. An empty string clears the infix.
    pub fn set_record_infix(&mut self, infix: &str) -> ComlogResult<()> {
        self.namer.set_infix(infix)?;
        self.events.emit(LogEvent::RecordInfixChanged {
            infix: infix.to_string(),
        });
        Ok(())
    }

    /// Close the open file, if any. Idempotent.
    pub fn force_close(&mut self) {
        self.close_file();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The configuration in force.
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Current logging mode.
    pub fn logging_mode(&self) -> LoggingMode {
        self.logging_mode
    }

    /// Whether a file is open.
    pub fn file_mode(&self) -> FileMode {
        if self.session.is_some() {
            FileMode::Open
        } else {
            FileMode::Closed
        }
    }

    /// Bytes written to the open file since it was opened or last wrapped;
    /// 0 when closed.
    pub fn byte_count(&self) -> u64 {
        self.session.as_ref().map_or(0, FileSession::byte_count)
    }

    /// Path of the open file.
    pub fn current_file(&self) -> Option<&Path> {
        self.session.as_ref().map(FileSession::path)
    }

    /// The record infix (empty when unset).
    pub fn record_infix(&self) -> &str {
        self.namer.infix()
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn roll_over(&mut self) {
        match self.config.rotation {
            RotationPolicy::RotateNewFile => self.close_file(),
            RotationPolicy::WrapInPlace => self.restart_file(),
        }
    }

    fn open_file(&mut self) {
        let identity = self.namer.next_identity(self.clock.as_ref());
        let file_name = identity.file_name();

        match FileSession::open(self.storage.as_mut(), identity, self.config.sync_mode) {
            Ok(session) => {
                self.throttle.open.reset();
                self.session = Some(session);
            }
            Err(error) => {
                if self.throttle.open.trip() {
                    self.events.emit(LogEvent::FileOpenError {
                        status: FileStatus::from(&error),
                        file_name,
                    });
                }
            }
        }
    }

    fn restart_file(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let file_name = session.identity().file_name();

        match session.rewind() {
            Ok(()) => self.events.emit(LogEvent::FileRestarted { file_name }),
            Err(error) => {
                // The write position is unknown; reopening truncates the same name.
                self.report_write_failure(
                    WriteFailure {
                        status: FileStatus::from(&error),
                        bytes_written: 0,
                        bytes_requested: 0,
                    },
                    file_name,
                );
                self.close_file();
            }
        }
    }

    fn write_payload(&mut self, payload: &[u8]) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.write_record(self.config.metadata, payload) {
            Ok(()) => self.throttle.write.reset(),
            Err(failure) => {
                let file_name = session.identity().file_name();
                self.report_write_failure(failure, file_name);
            }
        }
    }

    fn report_write_failure(&mut self, failure: WriteFailure, file_name: String) {
        if self.throttle.write.trip() {
            self.events.emit(LogEvent::FileWriteError {
                status: failure.status,
                bytes_written: failure.bytes_written,
                bytes_requested: failure.bytes_requested,
                file_name,
            });
        }
    }

    fn close_file(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let report = session.close(self.validator.as_deref());
        debug!(file = %report.identity, "Closed log file");
        self.report_close(report);
    }

    fn report_close(&mut self, report: CloseReport) {
        let file_name = report.identity.file_name();

        if let Err(error) = report.flush {
            self.report_write_failure(
                WriteFailure {
                    status: FileStatus::from(&error),
                    bytes_written: 0,
                    bytes_requested: 0,
                },
                file_name.clone(),
            );
        }

        if let Some((sidecar_path, Err(error))) = report.sidecar {
            self.events.emit(LogEvent::SidecarValidationError {
                file_name: file_name.clone(),
                sidecar_name: sidecar_path.display().to_string(),
                status: error.status(),
            });
        }

        self.events.emit(LogEvent::FileClosed { file_name });
    }
}

impl Drop for LogController {
    /// Teardown close: the file is closed and its sidecar written, but
    /// nothing is reported; the sink may already be unusable.
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.close(self.validator.as_deref());
        }
    }
}
