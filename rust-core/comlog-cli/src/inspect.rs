// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! `comlog dump` and `comlog verify`.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use comlog_core::{verify_sidecar, DigestAlgorithm, MetadataLayout, RecordIter};
use tracing::info;

/// Bytes shown per record in a dump.
const PREVIEW_BYTES: usize = 16;

/// Print one line per record: index, length, hex preview.
pub fn dump(file: &Path, layout: MetadataLayout) -> anyhow::Result<()> {
    let data = fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
    let mut out = io::stdout().lock();

    let mut count = 0usize;
    for (index, record) in RecordIter::new(&data, layout, file.display().to_string()).enumerate() {
        let payload = record.with_context(|| format!("after {count} records"))?;
        writeln!(out, "{index:>6}  {:>5}  {}", payload.len(), hex_preview(payload))?;
        count += 1;
    }

    info!(records = count, bytes = data.len(), file = %file.display(), "Dumped log file");
    Ok(())
}

/// Check `file` against its sidecar.
pub fn verify(file: &Path, sidecar: Option<&Path>) -> anyhow::Result<()> {
    let sidecar = match sidecar {
        Some(path) => path.to_path_buf(),
        None => default_sidecar(file)?,
    };

    verify_sidecar(file, &sidecar)
        .with_context(|| format!("{} failed verification", file.display()))?;
    println!("OK  {}  ({})", file.display(), sidecar.display());
    Ok(())
}

/// `FILE.CRC32` if present, else `FILE.SHA256`.
fn default_sidecar(file: &Path) -> anyhow::Result<PathBuf> {
    for algorithm in [DigestAlgorithm::Crc32, DigestAlgorithm::Sha256] {
        let candidate = PathBuf::from(format!("{}{}", file.display(), algorithm.extension()));
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    bail!("no sidecar found for {}", file.display())
}

/// Lowercase hex of the first bytes, with `..` when truncated.
fn hex_preview(payload: &[u8]) -> String {
    let mut text = String::with_capacity(PREVIEW_BYTES * 3 + 2);
    for (i, byte) in payload.iter().take(PREVIEW_BYTES).enumerate() {
        if i > 0 {
            text.push(' ');
        }
        let _ = write!(text, "{byte:02x}");
    }
    if payload.len() > PREVIEW_BYTES {
        text.push_str(" ..");
    }
    text
}
