// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - File system seam
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The logger only needs four things from a file: sequential writes, a
// seek back to offset 0 (wrap mode), a truncate, and a sync. `LogStorage` hands out
// such files so that tests can substitute full disks and broken handles.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, Write};
use std::path::Path;

/// An open output file.
pub trait LogFile: Write + Seek + Send {
    /// Flush file contents to stable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Truncate or extend the file to `len` bytes.
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

/// Opens output files.
pub trait LogStorage: Send {
    /// Open `path` for writing, creating it if needed and truncating any
    /// previous contents.
    fn create(&mut self, path: &Path) -> io::Result<Box<dyn LogFile>>;
}

/// The real file system. Parent directories are not created; a prefix that
/// points into a missing directory fails to open.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl LogStorage for FsStorage {
    fn create(&mut self, path: &Path) -> io::Result<Box<dyn LogFile>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(file))
    }
}
