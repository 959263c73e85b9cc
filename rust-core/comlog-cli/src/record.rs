// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! `comlog record`: split an input stream into records and log them.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};

use anyhow::Context;
use comlog_core::{
    EventSink, LogController, LogEvent, LoggerConfig, RotationPolicy, MAX_PAYLOAD_SIZE,
};
use tracing::{info, warn};

use crate::RecordArgs;

/// How the input stream is cut into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One record per line, without the line terminator.
    Lines,
    /// One record per N bytes; the last record may be shorter.
    Chunks(usize),
}

/// Writes each notification to a writer as one JSON object per line.
pub struct JsonLinesEvents<W> {
    out: W,
}

impl<W: Write + Send> JsonLinesEvents<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> EventSink for JsonLinesEvents<W> {
    fn emit(&mut self, event: LogEvent) {
        let result = serde_json::to_writer(&mut self.out, &event)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(error) = result {
            warn!(%error, "Failed to write JSON event");
        }
    }
}

/// Run `comlog record`.
pub fn run(args: &RecordArgs) -> anyhow::Result<()> {
    let config = build_config(args)?;
    let mut controller = LogController::new(config).context("invalid logger configuration")?;
    if args.json_events {
        controller = controller.with_events(JsonLinesEvents::new(io::stdout()));
    }
    if let Some(infix) = &args.infix {
        controller
            .set_record_infix(infix)
            .with_context(|| format!("invalid record infix {infix:?}"))?;
    }

    let framing = match (args.lines, args.chunk_size) {
        (false, Some(size)) => Framing::Chunks(size as usize),
        _ => Framing::Lines,
    };

    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("cannot open input {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let mut records = 0u64;
    let mut bytes = 0u64;
    for_each_record(BufReader::new(input), framing, |payload| {
        controller.submit(payload);
        records += 1;
        bytes += payload.len() as u64;
    })
    .context("failed to read input")?;
    controller.force_close();

    info!(records, bytes, "Recording finished");
    Ok(())
}

/// Layer the command-line overrides onto the configuration file (or the
/// defaults when none is given).
pub fn build_config(args: &RecordArgs) -> anyhow::Result<LoggerConfig> {
    let mut config = match &args.config {
        Some(path) => LoggerConfig::from_json_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => LoggerConfig::default(),
    };

    if let Some(prefix) = &args.prefix {
        config.file_prefix = prefix.clone();
    }
    if let Some(max_file_size) = args.max_file_size {
        config.max_file_size = max_file_size;
    }
    if args.wrap {
        config.rotation = RotationPolicy::WrapInPlace;
    }
    if let Some(layout) = args.layout {
        config.metadata = layout.into();
    }
    if let Some(sidecar) = args.sidecar {
        config.sidecar = sidecar.into();
    }
    Ok(config)
}

/// Cut `input` into records and hand each to `submit`.
///
/// Records longer than the per-record limit are split at the limit.
pub fn for_each_record<R, F>(mut input: R, framing: Framing, mut submit: F) -> io::Result<()>
where
    R: BufRead,
    F: FnMut(&[u8]),
{
    let mut buf = Vec::new();
    match framing {
        Framing::Lines => loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            if buf.is_empty() {
                submit(&buf);
            }
            for piece in buf.chunks(MAX_PAYLOAD_SIZE) {
                submit(piece);
            }
        },
        Framing::Chunks(size) => {
            buf.resize(size.min(MAX_PAYLOAD_SIZE), 0);
            loop {
                let filled = fill(&mut input, &mut buf)?;
                if filled == 0 {
                    return Ok(());
                }
                submit(&buf[..filled]);
                if filled < buf.len() {
                    return Ok(());
                }
            }
        }
    }
}

/// Read until `buf` is full or the input ends; returns the bytes read.
fn fill(input: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}
