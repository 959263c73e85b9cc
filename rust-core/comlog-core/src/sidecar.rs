// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Validation sidecars
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// When a log file is closed a digest of its bytes is written next to it so
// later corruption can be detected. The sidecar is one line in checksum
// utility format:
//
//   <lowercase hex digest>  <log file base name>\n

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use crc32fast::Hasher as Crc32Hasher;
use sha2::{Digest, Sha256};

use crate::config::DigestAlgorithm;
use crate::error::SidecarError;

/// Read buffer size used while hashing.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Produces the sidecar for a completed log file.
pub trait Validator: Send {
    /// Extension appended to the primary name to name the sidecar.
    fn extension(&self) -> &str;

    /// Hash `log_path` and write the result to `sidecar_path`.
    fn create_validation(&self, log_path: &Path, sidecar_path: &Path) -> Result<(), SidecarError>;
}

/// Validator backed by one of the built-in digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestValidator {
    algorithm: DigestAlgorithm,
}

impl DigestValidator {
    /// Validator for `algorithm`.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm in use.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl Validator for DigestValidator {
    fn extension(&self) -> &str {
        self.algorithm.extension()
    }

    fn create_validation(&self, log_path: &Path, sidecar_path: &Path) -> Result<(), SidecarError> {
        let digest = digest_file(self.algorithm, log_path)?;
        let line = format!("{digest}  {}\n", base_name(log_path));
        fs::write(sidecar_path, line).map_err(|source| SidecarError::SidecarUnwritable {
            path: sidecar_path.display().to_string(),
            source,
        })
    }
}

/// Hex digest of the whole file at `path`.
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> Result<String, SidecarError> {
    let unreadable = |source: io::Error| SidecarError::LogUnreadable {
        path: path.display().to_string(),
        source,
    };
    let mut file = File::open(path).map_err(unreadable)?;
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    match algorithm {
        DigestAlgorithm::Crc32 => {
            let mut hasher = Crc32Hasher::new();
            loop {
                let read = file.read(&mut buffer).map_err(unreadable)?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
            }
            Ok(format!("{:08x}", hasher.finalize()))
        }
        DigestAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let read = file.read(&mut buffer).map_err(unreadable)?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
            }
            Ok(hasher
                .finalize()
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .collect::<String>())
        }
    }
}

/// Check `log_path` against the digest stored in `sidecar_path`. The
/// algorithm is taken from the sidecar's extension.
pub fn verify_sidecar(log_path: &Path, sidecar_path: &Path) -> Result<(), SidecarError> {
    let sidecar_name = sidecar_path.display().to_string();
    let algorithm = DigestAlgorithm::from_sidecar_path(sidecar_path).ok_or_else(|| {
        SidecarError::UnknownAlgorithm {
            path: sidecar_name.clone(),
        }
    })?;

    let text = fs::read_to_string(sidecar_path).map_err(|source| SidecarError::SidecarUnreadable {
        path: sidecar_name.clone(),
        source,
    })?;
    let expected = text
        .split_whitespace()
        .next()
        .filter(|digest| is_hex_digest(digest, algorithm))
        .ok_or(SidecarError::Malformed { path: sidecar_name })?
        .to_ascii_lowercase();

    let actual = digest_file(algorithm, log_path)?;
    if actual != expected {
        return Err(SidecarError::Mismatch {
            path: log_path.display().to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn is_hex_digest(candidate: &str, algorithm: DigestAlgorithm) -> bool {
    let expected_len = match algorithm {
        DigestAlgorithm::Crc32 => 8,
        DigestAlgorithm::Sha256 => 64,
    };
    candidate.len() == expected_len && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
