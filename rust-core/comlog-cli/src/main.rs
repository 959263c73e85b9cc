// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! comlog - Record, dump and verify framed binary log files.
//!
//! - `record` streams stdin (or a file) into rotating log files, one
//!   record per line or per fixed-size chunk
//! - `dump` lists the records of one file with a hex preview
//! - `verify` checks a file against its checksum sidecar

mod inspect;
mod record;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use comlog_core::{DigestAlgorithm, MetadataLayout, MAX_PAYLOAD_SIZE};

/// Version string, pulled from Cargo.toml at compile time.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// comlog - streaming binary record logger.
#[derive(Parser, Debug)]
#[command(name = "comlog", version = VERSION, about = "Streaming binary record logger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log input records into size-bounded files.
    Record(RecordArgs),

    /// Print the records of a log file.
    Dump {
        /// Log file to read.
        file: PathBuf,

        /// Metadata layout the file was written with.
        #[arg(long, value_enum, default_value_t = LayoutArg::KeyAndLength)]
        layout: LayoutArg,
    },

    /// Check a log file against its checksum sidecar.
    Verify {
        /// Log file to check.
        file: PathBuf,

        /// Sidecar path (default: FILE.CRC32, then FILE.SHA256).
        #[arg(long)]
        sidecar: Option<PathBuf>,
    },
}

/// Options for `comlog record`.
#[derive(clap::Args, Debug)]
pub struct RecordArgs {
    /// JSON configuration file; flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// File name prefix (may include a directory).
    #[arg(long)]
    pub prefix: Option<String>,

    /// Maximum bytes per file.
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Wrap one file in place instead of rotating to new files.
    #[arg(long)]
    pub wrap: bool,

    /// Per-record metadata layout.
    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    /// Sidecar digest written when a file closes.
    #[arg(long, value_enum)]
    pub sidecar: Option<SidecarArg>,

    /// Tag inserted into new file names.
    #[arg(long)]
    pub infix: Option<String>,

    /// One record per input line (the default).
    #[arg(long, conflicts_with = "chunk_size")]
    pub lines: bool,

    /// One record per N input bytes.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_PAYLOAD_SIZE as i64))]
    pub chunk_size: Option<u32>,

    /// Print notifications to stdout as JSON lines.
    #[arg(long)]
    pub json_events: bool,

    /// Input file (default: stdin).
    pub input: Option<PathBuf>,
}

/// Metadata layout as a CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    KeyAndLength,
    LengthOnly,
    Raw,
}

impl From<LayoutArg> for MetadataLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::KeyAndLength => MetadataLayout::KeyAndLength,
            LayoutArg::LengthOnly => MetadataLayout::LengthOnly,
            LayoutArg::Raw => MetadataLayout::Raw,
        }
    }
}

/// Sidecar choice as a CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SidecarArg {
    Crc32,
    Sha256,
    None,
}

impl From<SidecarArg> for Option<DigestAlgorithm> {
    fn from(arg: SidecarArg) -> Self {
        match arg {
            SidecarArg::Crc32 => Some(DigestAlgorithm::Crc32),
            SidecarArg::Sha256 => Some(DigestAlgorithm::Sha256),
            SidecarArg::None => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries dump output and JSON events.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Record(args) => record::run(&args),
        Commands::Dump { file, layout } => inspect::dump(&file, layout.into()),
        Commands::Verify { file, sidecar } => inspect::verify(&file, sidecar.as_deref()),
    }
}
