// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - File naming
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every primary file is named `<prefix><infix><suffix>`:
//   infix  = "" or "_<record name>"
//   suffix = "<ext>"                                   (wrap mode)
//          | "_<timebase>_<seconds>_<microseconds:06><ext>"  (rotate mode)
// The sidecar is the primary name plus the digest extension. A name is
// computed once when a file is opened and never changes while it is open.

use std::fmt;
use std::path::PathBuf;

use crate::clock::{Clock, Timestamp};
use crate::config::{LoggerConfig, RotationPolicy};
use crate::error::{ComlogError, ComlogResult};

/// Longest record infix accepted, in bytes.
pub const MAX_INFIX_LENGTH: usize = 80;

/// Budget reserved for the generated suffix, in bytes.
pub const MAX_SUFFIX_LENGTH: usize = 80;

/// Longest full file name: NAME_MAX + PATH_MAX on Linux.
pub const MAX_FILENAME_LENGTH: usize = 255 + 4096;

/// Longest file prefix accepted, in bytes.
pub const MAX_PREFIX_LENGTH: usize = MAX_FILENAME_LENGTH - MAX_INFIX_LENGTH - MAX_SUFFIX_LENGTH;

/// The three parts of a primary file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    /// Path and base name from the configuration.
    pub prefix: String,
    /// Record name, empty when unset.
    pub infix: String,
    /// Timestamp and/or extension.
    pub suffix: String,
}

impl FileIdentity {
    /// The full primary file name.
    pub fn file_name(&self) -> String {
        if self.infix.is_empty() {
            format!("{}{}", self.prefix, self.suffix)
        } else {
            format!("{}_{}{}", self.prefix, self.infix, self.suffix)
        }
    }

    /// The primary file as a path.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.file_name())
    }

    /// The sidecar path for the given digest extension.
    pub fn sidecar_path(&self, extension: &str) -> PathBuf {
        PathBuf::from(format!("{}{extension}", self.file_name()))
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Suffix for a file opened at `timestamp`.
pub fn timestamp_suffix(timestamp: Timestamp, extension: &str) -> String {
    format!(
        "_{}_{}_{:06}{extension}",
        timestamp.time_base.code(),
        timestamp.seconds,
        timestamp.microseconds
    )
}

/// Derives file identities from the configuration and the current infix.
#[derive(Debug, Clone)]
pub struct FileNamer {
    prefix: String,
    extension: String,
    rotation: RotationPolicy,
    infix: String,
}

impl FileNamer {
    /// Namer for a validated configuration, with no infix.
    pub fn new(config: &LoggerConfig) -> Self {
        Self {
            prefix: config.file_prefix.clone(),
            extension: config.file_extension.clone(),
            rotation: config.rotation,
            infix: String::new(),
        }
    }

    /// The current record infix (empty when unset).
    pub fn infix(&self) -> &str {
        &self.infix
    }

    /// Replace the infix used for files opened from now on. An empty
    /// string clears it.
    pub fn set_infix(&mut self, infix: &str) -> ComlogResult<()> {
        if infix.len() > MAX_INFIX_LENGTH {
            return Err(ComlogError::InfixTooLong {
                length: infix.len(),
                max_length: MAX_INFIX_LENGTH,
            });
        }
        if infix.contains(['/', '\\', '\0']) {
            return Err(ComlogError::InvalidInfix(infix.to_string()));
        }
        self.infix = infix.to_string();
        Ok(())
    }

    /// Identity for the next file to open. The clock is only read in
    /// rotate mode; a wrapped file keeps one name for its whole life.
    pub fn next_identity(&self, clock: &dyn Clock) -> FileIdentity {
        let suffix = match self.rotation {
            RotationPolicy::WrapInPlace => self.extension.clone(),
            RotationPolicy::RotateNewFile => timestamp_suffix(clock.now(), &self.extension),
        };
        FileIdentity {
            prefix: self.prefix.clone(),
            infix: self.infix.clone(),
            suffix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, TimeBase};

    fn namer(rotation: RotationPolicy) -> FileNamer {
        FileNamer::new(&LoggerConfig::new("build_test_comlogger_file", 100).with_rotation(rotation))
    }

    fn clock() -> ManualClock {
        ManualClock::new(Timestamp::new(TimeBase::None, 0, 9_876_543))
    }

    #[test]
    fn test_rotate_suffix_format() {
        let stamp = Timestamp::new(TimeBase::Workstation, 1_700_000_000, 42);
        assert_eq!(timestamp_suffix(stamp, ".com"), "_2_1700000000_000042.com");
    }

    #[test]
    fn test_rotate_name_embeds_clock() {
        let identity = namer(RotationPolicy::RotateNewFile).next_identity(&clock());
        assert_eq!(identity.file_name(), "build_test_comlogger_file_0_0_9876543.com");
        assert_eq!(
            identity.sidecar_path(".CRC32"),
            PathBuf::from("build_test_comlogger_file_0_0_9876543.com.CRC32")
        );
    }

    #[test]
    fn test_wrap_name_ignores_clock() {
        let namer = namer(RotationPolicy::WrapInPlace);
        let clock = clock();
        let first = namer.next_identity(&clock);
        clock.advance_seconds(5);
        let second = namer.next_identity(&clock);
        assert_eq!(first, second);
        assert_eq!(first.file_name(), "build_test_comlogger_file.com");
    }

    #[test]
    fn test_infix_is_inserted_and_cleared() {
        let mut namer = namer(RotationPolicy::RotateNewFile);
        namer.set_infix("REC_1").unwrap();
        assert_eq!(
            namer.next_identity(&clock()).file_name(),
            "build_test_comlogger_file_REC_1_0_0_9876543.com"
        );

        namer.set_infix("").unwrap();
        assert_eq!(
            namer.next_identity(&clock()).file_name(),
            "build_test_comlogger_file_0_0_9876543.com"
        );
    }

    #[test]
    fn test_infix_validation() {
        let mut namer = namer(RotationPolicy::RotateNewFile);
        namer.set_infix("keep").unwrap();

        let long = "x".repeat(MAX_INFIX_LENGTH + 1);
        assert!(matches!(
            namer.set_infix(&long),
            Err(ComlogError::InfixTooLong { .. })
        ));
        assert!(matches!(
            namer.set_infix("../escape"),
            Err(ComlogError::InvalidInfix(_))
        ));
        assert_eq!(namer.infix(), "keep");
    }

    #[test]
    fn test_prefix_budget() {
        assert_eq!(MAX_PREFIX_LENGTH, 4351 - 160);
    }
}
