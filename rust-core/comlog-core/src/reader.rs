// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Record reader
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Splits a log file back into the payloads that were submitted, using the
// metadata layout it was written with. Only layouts that carry a length
// can be split; a `Raw` file is one undelimited byte stream.
//
// A wrapped file is cut back to its write position when it is closed.
// While it is still open, stale bytes from before the wrap may follow the
// newest records and will not parse cleanly.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::MetadataLayout;
use crate::error::{ComlogError, ComlogResult};
use crate::frame::FRAME_START_KEY;

/// Iterator over the payloads in a byte slice.
///
/// Yields `Err` once on the first malformed record and then stops.
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    data: &'a [u8],
    offset: usize,
    layout: MetadataLayout,
    label: String,
    failed: bool,
}

impl<'a> RecordIter<'a> {
    /// Iterate over the records in `data`. `label` names the source in errors.
    pub fn new(data: &'a [u8], layout: MetadataLayout, label: impl Into<String>) -> Self {
        Self {
            data,
            offset: 0,
            layout,
            label: label.into(),
            failed: false,
        }
    }

    /// Byte offset of the next record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_u16(&self, at: usize) -> Option<u16> {
        let bytes = self.data.get(at..at + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn truncated(&self) -> ComlogError {
        ComlogError::TruncatedRecord {
            offset: self.offset as u64,
            file: self.label.clone(),
        }
    }

    fn parse_next(&mut self) -> ComlogResult<&'a [u8]> {
        if !self.layout.has_length() {
            return Err(ComlogError::UnframedLayout(self.layout));
        }

        let mut cursor = self.offset;
        if self.layout.has_key() {
            let key = self.read_u16(cursor).ok_or_else(|| self.truncated())?;
            if key != FRAME_START_KEY {
                return Err(ComlogError::BadFrameKey {
                    offset: self.offset as u64,
                    found: key,
                });
            }
            cursor += 2;
        }

        let length = self.read_u16(cursor).ok_or_else(|| self.truncated())? as usize;
        cursor += 2;

        let data: &'a [u8] = self.data;
        let payload = data
            .get(cursor..cursor + length)
            .ok_or_else(|| self.truncated())?;
        self.offset = cursor + length;
        Ok(payload)
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = ComlogResult<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let result = self.parse_next();
        self.failed = result.is_err();
        Some(result)
    }
}

/// Read every record from the log file at `path`.
pub fn read_records(path: impl AsRef<Path>, layout: MetadataLayout) -> ComlogResult<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let records = RecordIter::new(&data, layout, path.display().to_string())
        .map(|record| record.map(<[u8]>::to_vec))
        .collect::<ComlogResult<Vec<_>>>()?;

    debug!(
        count = records.len(),
        file = %path.display(),
        "Read log records"
    );
    Ok(records)
}
