//! Harness commands.
//!
//! Every command writes its output through a caller-supplied
//! [`RawStream`] so tests can capture it with a pipe instead of stdout.

use std::path::Path;

use thiserror::Error;

use rawfile_core::errno;
use rawfile_core::error::{IoOp, io_error};
use rawfile_core::{ModeGrammar, Opener, RawStream, StreamError, parse_mode};

use crate::report::{FlagsReport, TransferReport};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

/// Write all of `data`, retrying short writes.
///
/// A write that accepts zero bytes for a non-empty buffer is an I/O error.
pub fn write_all<S: RawStream + ?Sized>(stream: &S, mut data: &[u8]) -> Result<usize, StreamError> {
    let total = data.len();
    while !data.is_empty() {
        let n = stream.write(data)?;
        if n == 0 {
            return Err(io_error(IoOp::Write, stream.fileno(), errno::EIO));
        }
        data = &data[n..];
    }
    Ok(total)
}

fn emit_line<S: RawStream + ?Sized>(out: &S, text: &str) -> Result<(), StreamError> {
    write_all(out, text.as_bytes())?;
    write_all(out, b"\n")?;
    Ok(())
}

/// Parse `mode` and describe the result.
pub fn flags<S: RawStream + ?Sized>(
    out: &S,
    mode: &str,
    grammar: ModeGrammar,
) -> Result<FlagsReport, HarnessError> {
    let parsed = parse_mode(mode, grammar)?;
    let report = FlagsReport::new(mode, grammar, parsed);
    emit_line(out, &serde_json::to_string(&report)?)?;
    Ok(report)
}

/// Copy a file to `out`. With `number_lines`, go through the line
/// iterator and prefix each line with its 1-based number.
pub fn cat<S: RawStream + ?Sized>(
    opener: &Opener,
    out: &S,
    path: &Path,
    number_lines: bool,
) -> Result<usize, HarnessError> {
    let source = opener.open(path, Some("r"))?;
    let written = source.scoped(|stream| {
        if !number_lines {
            return write_all(out, &stream.readall()?);
        }
        let mut written = 0;
        for (index, line) in stream.lines().enumerate() {
            let line = line?;
            written += write_all(out, format!("{:>6}\t", index + 1).as_bytes())?;
            written += write_all(out, &line)?;
        }
        Ok::<_, StreamError>(written)
    })?;
    Ok(written)
}

/// Write `text` to `path` opened with `mode`.
pub fn write_text<S: RawStream + ?Sized>(
    opener: &Opener,
    out: &S,
    path: &Path,
    text: &str,
    mode: &str,
) -> Result<TransferReport, HarnessError> {
    let target = opener.open(path, Some(mode))?;
    let bytes = target.scoped(|stream| write_all(stream, text.as_bytes()))?;
    let report = TransferReport {
        command: "write".to_string(),
        source: None,
        destination: path.display().to_string(),
        mode: mode.to_string(),
        bytes,
    };
    emit_line(out, &report.to_json()?)?;
    Ok(report)
}

/// Copy `src` to `dst`, truncating or creating `dst`.
pub fn copy<S: RawStream + ?Sized>(
    opener: &Opener,
    out: &S,
    src: &Path,
    dst: &Path,
) -> Result<TransferReport, HarnessError> {
    let data = opener.open(src, Some("r"))?.scoped(|s| s.readall())?;
    let bytes = opener
        .open(dst, Some("w"))?
        .scoped(|s| write_all(s, &data))?;
    let report = TransferReport {
        command: "copy".to_string(),
        source: Some(src.display().to_string()),
        destination: dst.display().to_string(),
        mode: "w".to_string(),
        bytes,
    };
    emit_line(out, &report.to_json()?)?;
    Ok(report)
}
