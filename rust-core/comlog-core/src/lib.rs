// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Rotating framed record logger
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Accepts opaque byte buffers one at a time, frames each with optional
// metadata, appends them to a log file, and rotates (or wraps) that file
// before it would exceed a configured size. Every completed file gets a
// checksum sidecar.
//
// # Architecture
//
// - `LogController` holds the logging mode and routes buffers and commands.
// - `FileSession` owns the one open file: byte count, look-ahead budget
//   check, wrap in place, close with sidecar.
// - `frame` builds the per-record metadata block.
// - `naming` derives `<prefix><infix><suffix>` file names.
// - `throttle` reports each class of storage failure once per episode.
//
// Time, file system, sidecar hashing and notification delivery are
// injected (`Clock`, `LogStorage`, `Validator`, `EventSink`).
//
// ## On-disk record format (integers big-endian)
//
// ```text
// [2 bytes: frame key 0x30FC]      -- key_and_length layout only
// [2 bytes: payload length (u16)]  -- key_and_length and length_only layouts
// [N bytes: payload]
// ```
//
// ## File names
//
// ```text
// rotate:  <prefix>[_<infix>]_<timebase>_<seconds>_<microseconds:06><ext>
// wrap:    <prefix>[_<infix>]<ext>
// sidecar: <primary name>.CRC32 | <primary name>.SHA256
// ```
//
// ## Usage
//
// ```no_run
// use comlog_core::{Command, LogController, LoggerConfig, RotationPolicy};
//
// let config = LoggerConfig::new("/tmp/downlink", 1024 * 1024)
//     .with_rotation(RotationPolicy::RotateNewFile);
// let mut logger = LogController::new(config).unwrap();
//
// logger.submit(b"\x01\x02\x03");
// logger.execute(Command::SetRecordInfix("PASS_7".to_string())).unwrap();
// logger.execute(Command::CloseFile).unwrap();
// ```

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod frame;
pub mod naming;
pub mod reader;
pub mod session;
pub mod sidecar;
pub mod storage;
pub mod throttle;

// Re-export the primary public API for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock, TimeBase, Timestamp};
pub use config::{
    DigestAlgorithm, LoggerConfig, MetadataLayout, RotationPolicy, SyncMode,
    DEFAULT_MAX_FILE_SIZE,
};
pub use controller::{Command, FileMode, LogController, LoggingMode};
pub use error::{ComlogError, ComlogResult, FileStatus, SidecarError, SidecarStatus};
pub use event::{EventSink, LogEvent, TracingEvents};
pub use frame::{encode_record, FrameHeader, FRAME_START_KEY, MAX_PAYLOAD_SIZE};
pub use naming::{FileIdentity, FileNamer, MAX_INFIX_LENGTH, MAX_PREFIX_LENGTH};
pub use reader::{read_records, RecordIter};
pub use session::{CloseReport, FileSession, WriteFailure};
pub use sidecar::{digest_file, verify_sidecar, DigestValidator, Validator};
pub use storage::{FsStorage, LogFile, LogStorage};
pub use throttle::{ErrorThrottle, Latch};
