// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Logger configuration
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The configuration is fixed when a `LogController` is built. Everything
// that decides the on-disk layout (metadata, prefix, extension, rotation)
// lives here so that one validated value is shared read-only by the namer,
// the framer and the file session.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ComlogError, ComlogResult};
use crate::naming::MAX_PREFIX_LENGTH;

/// Default maximum file size in bytes (64 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Default file extension of primary log files.
pub const DEFAULT_FILE_EXTENSION: &str = ".com";

/// Default file prefix (relative to the working directory).
pub const DEFAULT_FILE_PREFIX: &str = "comlog";

// ---------------------------------------------------------------------------
// RotationPolicy
// ---------------------------------------------------------------------------

/// What happens when the next record would push a file over its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Close the file (writing its sidecar) and open a new, timestamped one.
    #[default]
    RotateNewFile,
    /// Seek the same file back to offset 0 and overwrite from the start.
    WrapInPlace,
}

// ---------------------------------------------------------------------------
// MetadataLayout
// ---------------------------------------------------------------------------

/// Which metadata fields precede each payload on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataLayout {
    /// `{key:u16}{length:u16}` before each payload (4 bytes).
    #[default]
    KeyAndLength,
    /// `{length:u16}` before each payload (2 bytes).
    LengthOnly,
    /// Payloads are written back to back with no metadata.
    Raw,
}

impl MetadataLayout {
    /// Number of metadata bytes written before every payload.
    pub const fn size(self) -> u64 {
        match self {
            Self::KeyAndLength => 4,
            Self::LengthOnly => 2,
            Self::Raw => 0,
        }
    }

    /// Whether the frame start key is emitted.
    pub const fn has_key(self) -> bool {
        matches!(self, Self::KeyAndLength)
    }

    /// Whether the payload length is emitted.
    pub const fn has_length(self) -> bool {
        matches!(self, Self::KeyAndLength | Self::LengthOnly)
    }
}

// ---------------------------------------------------------------------------
// SyncMode
// ---------------------------------------------------------------------------

/// Controls how aggressively the session calls `fsync` on the open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Sync after every record.
    Fsync,

    /// Sync at most once per the given interval.
    Periodic(Duration),

    /// Never sync explicitly while writing; closing still flushes.
    #[default]
    Async,
}

// ---------------------------------------------------------------------------
// DigestAlgorithm
// ---------------------------------------------------------------------------

/// Hash used for the validation sidecar of each completed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    /// IEEE CRC32, sidecar extension `.CRC32`.
    #[default]
    Crc32,
    /// SHA-256, sidecar extension `.SHA256`.
    Sha256,
}

impl DigestAlgorithm {
    /// The extension appended to the primary file name to name the sidecar.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Crc32 => ".CRC32",
            Self::Sha256 => ".SHA256",
        }
    }

    /// Infer the algorithm from a sidecar path's extension.
    pub fn from_sidecar_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        [Self::Crc32, Self::Sha256]
            .into_iter()
            .find(|algorithm| name.ends_with(algorithm.extension()))
    }
}

// ---------------------------------------------------------------------------
// LoggerConfig
// ---------------------------------------------------------------------------

/// Configuration of a record logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Path and base name of every log file, e.g. `/var/log/radio/downlink`.
    pub file_prefix: String,

    /// Upper bound on the size of any single log file, in bytes.
    pub max_file_size: u64,

    /// Rotate to a new file or wrap the current one when full.
    pub rotation: RotationPolicy,

    /// Metadata emitted before each payload.
    pub metadata: MetadataLayout,

    /// Extension appended to every primary file name (including the dot).
    pub file_extension: String,

    /// Sidecar digest, or `None` to skip sidecar generation.
    pub sidecar: Option<DigestAlgorithm>,

    /// How often the open file is synced to stable storage.
    pub sync_mode: SyncMode,
}

impl LoggerConfig {
    /// Configuration with the given prefix and size budget and default
    /// options for everything else.
    pub fn new(file_prefix: impl Into<String>, max_file_size: u64) -> Self {
        Self {
            file_prefix: file_prefix.into(),
            max_file_size,
            ..Self::default()
        }
    }

    /// Set the rotation policy.
    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the metadata layout.
    pub fn with_metadata(mut self, metadata: MetadataLayout) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the sidecar digest (or disable sidecars with `None`).
    pub fn with_sidecar(mut self, sidecar: Option<DigestAlgorithm>) -> Self {
        self.sidecar = sidecar;
        self
    }

    /// Set the sync mode.
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Load a configuration from a JSON file. Missing fields take their
    /// defaults. The result is validated before it is returned.
    pub fn from_json_file(path: impl AsRef<Path>) -> ComlogResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a controller relies on.
    pub fn validate(&self) -> ComlogResult<()> {
        if self.file_prefix.is_empty() {
            return Err(ComlogError::EmptyPrefix);
        }
        if self.file_prefix.len() > MAX_PREFIX_LENGTH {
            return Err(ComlogError::PrefixTooLong {
                length: self.file_prefix.len(),
                max_length: MAX_PREFIX_LENGTH,
            });
        }
        let metadata_size = self.metadata.size();
        if self.max_file_size <= metadata_size {
            return Err(ComlogError::MaxFileSizeTooSmall {
                max_file_size: self.max_file_size,
                metadata_size,
            });
        }
        Ok(())
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            rotation: RotationPolicy::default(),
            metadata: MetadataLayout::default(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            sidecar: Some(DigestAlgorithm::default()),
            sync_mode: SyncMode::default(),
        }
    }
}
