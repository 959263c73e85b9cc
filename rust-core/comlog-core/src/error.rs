// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Defines the error conditions of the record logger: configuration
// validation, record parsing, sidecar generation/verification, and the
// compact status codes that notifications carry in place of full errors.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MetadataLayout;

/// Errors that can occur while configuring the logger or reading its output.
///
/// The record path (`LogController::submit`) never returns these; failures
/// there are absorbed and surfaced as notifications instead.
#[derive(Debug, Error)]
pub enum ComlogError {
    /// An I/O error occurred while reading a log file or a config file.
    #[error("comlog I/O error: {0}")]
    Io(#[from] io::Error),

    /// The JSON configuration document could not be parsed.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The size budget cannot hold even the per-record metadata.
    #[error("max file size {max_file_size} must exceed the record metadata size {metadata_size}")]
    MaxFileSizeTooSmall {
        /// The configured maximum file size in bytes.
        max_file_size: u64,
        /// The per-record metadata size of the configured layout.
        metadata_size: u64,
    },

    /// The file prefix is empty.
    #[error("file prefix must not be empty")]
    EmptyPrefix,

    /// The file prefix exceeds the allowed length.
    #[error("file prefix is {length} bytes, exceeding maximum {max_length}")]
    PrefixTooLong {
        /// Length of the rejected prefix in bytes.
        length: usize,
        /// The maximum allowed prefix length.
        max_length: usize,
    },

    /// The record infix exceeds the allowed length.
    #[error("record infix is {length} bytes, exceeding maximum {max_length}")]
    InfixTooLong {
        /// Length of the rejected infix in bytes.
        length: usize,
        /// The maximum allowed infix length.
        max_length: usize,
    },

    /// The record infix contains a character that cannot appear in a file name.
    #[error("record infix {0:?} contains a path separator or NUL byte")]
    InvalidInfix(String),

    /// A record header promises more bytes than remain in the file.
    #[error("truncated record at offset {offset} in {file}")]
    TruncatedRecord {
        /// Byte offset of the record header.
        offset: u64,
        /// The file (or buffer label) being parsed.
        file: String,
    },

    /// A record does not start with the frame start key.
    #[error("bad frame key {found:#06x} at offset {offset}")]
    BadFrameKey {
        /// Byte offset of the record header.
        offset: u64,
        /// The two bytes found where the key was expected.
        found: u16,
    },

    /// Records written without a length prefix cannot be split apart again.
    #[error("records written with the {0:?} layout carry no length and cannot be parsed")]
    UnframedLayout(MetadataLayout),

    /// Sidecar generation or verification failed.
    #[error(transparent)]
    Sidecar(#[from] SidecarError),
}

/// Convenience type alias for comlog results.
pub type ComlogResult<T> = Result<T, ComlogError>;

// ---------------------------------------------------------------------------
// SidecarError
// ---------------------------------------------------------------------------

/// Failures of the checksum sidecar step.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// The log file could not be read for hashing.
    #[error("cannot read log file {path}: {source}")]
    LogUnreadable {
        /// The log file path.
        path: String,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The sidecar file could not be written.
    #[error("cannot write sidecar {path}: {source}")]
    SidecarUnwritable {
        /// The sidecar file path.
        path: String,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The sidecar file could not be read back for verification.
    #[error("cannot read sidecar {path}: {source}")]
    SidecarUnreadable {
        /// The sidecar file path.
        path: String,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The sidecar does not contain a digest of the expected shape.
    #[error("sidecar {path} is malformed")]
    Malformed {
        /// The sidecar file path.
        path: String,
    },

    /// The sidecar extension does not name a known digest algorithm.
    #[error("sidecar {path} has no recognised digest extension")]
    UnknownAlgorithm {
        /// The sidecar file path.
        path: String,
    },

    /// The stored digest does not match the log file contents.
    #[error("digest mismatch for {path}: sidecar has {expected}, file hashes to {actual}")]
    Mismatch {
        /// The log file path.
        path: String,
        /// Digest recorded in the sidecar.
        expected: String,
        /// Digest computed from the log file.
        actual: String,
    },
}

impl SidecarError {
    /// The status code reported in a `SidecarValidationError` notification.
    pub fn status(&self) -> SidecarStatus {
        match self {
            Self::LogUnreadable { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => SidecarStatus::LogMissing,
                _ => SidecarStatus::LogUnreadable,
            },
            Self::SidecarUnwritable { source, .. } => match source.kind() {
                io::ErrorKind::StorageFull => SidecarStatus::NoSpace,
                _ => SidecarStatus::SidecarUnwritable,
            },
            Self::SidecarUnreadable { .. } => SidecarStatus::SidecarUnreadable,
            Self::Malformed { .. } | Self::UnknownAlgorithm { .. } => SidecarStatus::Malformed,
            Self::Mismatch { .. } => SidecarStatus::Mismatch,
        }
    }
}

// ---------------------------------------------------------------------------
// Status codes carried in notifications
// ---------------------------------------------------------------------------

/// Compact classification of a file open/write failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// A path component does not exist.
    DoesntExist,
    /// The process lacks permission for the path.
    NoPermission,
    /// The device is out of space.
    NoSpace,
    /// The path names a directory.
    IsDirectory,
    /// A short write without an underlying error.
    ShortWrite,
    /// Anything else.
    Other,
}

impl From<&io::Error> for FileStatus {
    fn from(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::DoesntExist,
            io::ErrorKind::PermissionDenied => Self::NoPermission,
            io::ErrorKind::StorageFull => Self::NoSpace,
            io::ErrorKind::IsADirectory => Self::IsDirectory,
            io::ErrorKind::WriteZero => Self::ShortWrite,
            _ => Self::Other,
        }
    }
}

/// Compact classification of a sidecar failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidecarStatus {
    /// The log file vanished before it could be hashed.
    LogMissing,
    /// The log file exists but could not be read.
    LogUnreadable,
    /// The sidecar could not be created or written.
    SidecarUnwritable,
    /// The device is out of space.
    NoSpace,
    /// The sidecar could not be read back.
    SidecarUnreadable,
    /// The sidecar content or name is not a valid digest record.
    Malformed,
    /// The digest does not match.
    Mismatch,
}
