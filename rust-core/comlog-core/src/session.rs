// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Open file session
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A `FileSession` exists exactly while a log file is open. It owns the
// handle, counts the bytes that reached the file, answers the look-ahead
// budget question, wraps in place, and on close flushes the handle and
// writes the validation sidecar. A wrapped file is cut back to its write
// position on close, so no record from before the wrap survives past the
// newest one. Deciding what to do about failures
// (throttling, notifications) is left to the controller.

use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use crate::config::{MetadataLayout, SyncMode};
use crate::error::{FileStatus, SidecarError};
use crate::frame::FrameHeader;
use crate::naming::FileIdentity;
use crate::sidecar::Validator;
use crate::storage::{LogFile, LogStorage};

/// A failed write of one block (metadata or payload) or a failed sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFailure {
    /// Failure classification.
    pub status: FileStatus,
    /// Bytes of the block that reached the file before the failure.
    pub bytes_written: usize,
    /// Size of the block.
    pub bytes_requested: usize,
}

/// What happened while closing a session.
#[derive(Debug)]
pub struct CloseReport {
    /// Name of the file that was closed.
    pub identity: FileIdentity,
    /// Result of the final flush/sync.
    pub flush: io::Result<()>,
    /// Sidecar path and outcome, when sidecars are enabled.
    pub sidecar: Option<(PathBuf, Result<(), SidecarError>)>,
}

/// One open log file.
pub struct FileSession {
    /// Name the file was opened under; fixed for the session's life.
    identity: FileIdentity,

    /// `identity` as a path.
    path: PathBuf,

    /// The open handle.
    file: Box<dyn LogFile>,

    /// Bytes written since the file was opened or last wrapped.
    byte_count: u64,

    /// Set once the file has been rewound; stale bytes may follow `byte_count`.
    wrapped: bool,

    /// How fsync is managed.
    sync_mode: SyncMode,

    /// Time of the last sync (for `SyncMode::Periodic`).
    last_sync: Instant,
}

impl FileSession {
    /// Open (create or truncate) the file named by `identity`.
    pub fn open(
        storage: &mut dyn LogStorage,
        identity: FileIdentity,
        sync_mode: SyncMode,
    ) -> io::Result<Self> {
        let path = identity.path();
        let file = storage.create(&path)?;
        debug!(file = %path.display(), "Opened log file");
        Ok(Self {
            identity,
            path,
            file,
            byte_count: 0,
            wrapped: false,
            sync_mode,
            last_sync: Instant::now(),
        })
    }

    /// Name of the open file.
    pub fn identity(&self) -> &FileIdentity {
        &self.identity
    }

    /// Path of the open file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written since open or the last wrap.
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Whether appending `record_len` more bytes would exceed `max_file_size`.
    pub fn would_overflow(&self, record_len: u64, max_file_size: u64) -> bool {
        self.byte_count + record_len > max_file_size
    }

    /// Seek back to offset 0 and restart the byte count. Bytes past the
    /// new write position stay in place until overwritten or until the
    /// file is closed.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.byte_count = 0;
        self.wrapped = true;
        debug!(file = %self.path.display(), "Rewound log file");
        Ok(())
    }

    /// Write one record: the metadata block, then the payload block.
    ///
    /// Stops at the first failing block. Bytes that did reach the file are
    /// counted either way, so the count always matches the write position.
    pub fn write_record(&mut self, layout: MetadataLayout, payload: &[u8]) -> Result<(), WriteFailure> {
        let header = FrameHeader::new(layout, payload.len());
        if !header.is_empty() {
            self.write_block(header.as_bytes())?;
        }
        self.write_block(payload)?;
        self.maybe_sync()
    }

    /// Flush and close the file, then write its sidecar. Nothing is
    /// logged; reporting is up to the caller.
    pub fn close(mut self, validator: Option<&dyn Validator>) -> CloseReport {
        let flush = self.finish();
        let Self { identity, path, file, .. } = self;
        drop(file);

        let sidecar = validator.map(|validator| {
            let sidecar_path = identity.sidecar_path(validator.extension());
            let outcome = validator.create_validation(&path, &sidecar_path);
            (sidecar_path, outcome)
        });

        CloseReport {
            identity,
            flush,
            sidecar,
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn write_block(&mut self, block: &[u8]) -> Result<(), WriteFailure> {
        let mut written = 0;
        let outcome = loop {
            if written == block.len() {
                break Ok(());
            }
            match self.file.write(&block[written..]) {
                Ok(0) => break Err(FileStatus::ShortWrite),
                Ok(count) => written += count,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => break Err(FileStatus::from(&error)),
            }
        };
        self.byte_count += written as u64;

        outcome.map_err(|status| WriteFailure {
            status,
            bytes_written: written,
            bytes_requested: block.len(),
        })
    }

    fn maybe_sync(&mut self) -> Result<(), WriteFailure> {
        let due = match self.sync_mode {
            SyncMode::Fsync => true,
            SyncMode::Periodic(interval) => self.last_sync.elapsed() >= interval,
            SyncMode::Async => false,
        };
        if due {
            self.sync().map_err(|error| WriteFailure {
                status: FileStatus::from(&error),
                bytes_written: 0,
                bytes_requested: 0,
            })?;
        }
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync()?;
        self.last_sync = Instant::now();
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.wrapped {
            self.file.set_len(self.byte_count)?;
        }
        match self.sync_mode {
            SyncMode::Async => Ok(()),
            SyncMode::Fsync | SyncMode::Periodic(_) => self.sync(),
        }
    }
}
