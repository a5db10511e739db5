//! Structured event logging for stream lifecycles.
//!
//! Provides:
//! - [`LogEntry`]: one JSONL record with required + optional fields.
//! - [`LogEmitter`]: writes JSONL lines to a file, stderr, or a shared buffer.
//! - A process-wide sink, initialised from [`crate::config`] on first use and
//!   replaceable with [`install`].
//!
//! Stream code checks [`enabled`] before building an entry and reports
//! through [`emit`].

use std::io::Write;
use std::os::fd::RawFd;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::{self, LogTarget};

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse from string (case-insensitive). Unknown values map to `Info`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fd: Option<RawFd>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: String::new(),
            level,
            event: event.into(),
            stream_id: None,
            fd: None,
            op: None,
            path: None,
            mode: None,
            flags: None,
            ownership: None,
            errno: None,
            bytes: None,
            details: None,
        }
    }

    /// Set the stream serial and descriptor.
    #[must_use]
    pub fn with_stream(mut self, stream_id: u64, fd: RawFd) -> Self {
        self.stream_id = Some(stream_id);
        self.fd = Some(fd);
        self
    }

    #[must_use]
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the mode string and the flags it produced.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>, flags: Option<i32>) -> Self {
        self.mode = Some(mode.into());
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_ownership(mut self, ownership: impl Into<String>) -> Self {
        self.ownership = Some(ownership.into());
        self
    }

    #[must_use]
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    #[must_use]
    pub fn with_bytes(mut self, bytes: usize) -> Self {
        self.bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// In-memory log destination that can be read back while the emitter runs.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().clone()
    }

    /// Parse the buffered JSONL lines, skipping any that fail to parse.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        let bytes = self.contents();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes structured JSONL log entries.
pub struct LogEmitter {
    writer: Box<dyn Write + Send>,
    min_level: LogLevel,
    seq: u64,
    run_id: String,
}

impl std::fmt::Debug for LogEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEmitter")
            .field("min_level", &self.min_level)
            .field("seq", &self.seq)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl LogEmitter {
    fn with_writer(writer: Box<dyn Write + Send>, min_level: LogLevel) -> Self {
        Self {
            writer,
            min_level,
            seq: 0,
            run_id: format!("rawfile-{}", std::process::id()),
        }
    }

    /// Create an emitter that appends to a file.
    pub fn to_file(path: &Path, min_level: LogLevel) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::with_writer(Box::new(file), min_level))
    }

    /// Create an emitter that writes to standard error.
    #[must_use]
    pub fn to_stderr(min_level: LogLevel) -> Self {
        Self::with_writer(Box::new(std::io::stderr()), min_level)
    }

    /// Create an emitter writing into a [`SharedBuffer`] (for testing).
    #[must_use]
    pub fn to_shared_buffer(min_level: LogLevel) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (
            Self::with_writer(Box::new(buffer.clone()), min_level),
            buffer,
        )
    }

    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{:06}", self.run_id, self.seq)
    }

    /// Emit an entry, filling in `trace_id` when empty. Entries below the
    /// emitter's level are dropped.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if !self.enabled(entry.level) {
            return Ok(());
        }
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Global sink
// ---------------------------------------------------------------------------

enum Sink {
    Unresolved,
    Resolved(Option<LogEmitter>),
}

static SINK: Mutex<Sink> = Mutex::new(Sink::Unresolved);

fn emitter_from_config(cfg: &config::RuntimeConfig) -> Option<LogEmitter> {
    match cfg.log_target.as_ref()? {
        LogTarget::Stderr => Some(LogEmitter::to_stderr(cfg.log_level)),
        // An unopenable log file disables logging rather than failing I/O.
        LogTarget::File(path) => LogEmitter::to_file(path, cfg.log_level).ok(),
    }
}

/// Replace the process-wide sink, returning the previous emitter.
pub fn install(emitter: Option<LogEmitter>) -> Option<LogEmitter> {
    let mut sink = SINK.lock();
    match std::mem::replace(&mut *sink, Sink::Resolved(emitter)) {
        Sink::Resolved(previous) => previous,
        Sink::Unresolved => None,
    }
}

fn with_sink<R>(f: impl FnOnce(Option<&mut LogEmitter>) -> R) -> R {
    let mut sink = SINK.lock();
    if matches!(*sink, Sink::Unresolved) {
        *sink = Sink::Resolved(emitter_from_config(config::runtime()));
    }
    match &mut *sink {
        Sink::Resolved(Some(emitter)) => f(Some(emitter)),
        _ => f(None),
    }
}

/// Whether an entry at `level` would be written anywhere.
#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    with_sink(|emitter| emitter.is_some_and(|e| e.enabled(level)))
}

/// Send an entry to the process-wide sink. Write failures are dropped:
/// logging never turns a successful stream operation into a failure.
pub fn emit(entry: LogEntry) {
    with_sink(|emitter| {
        if let Some(emitter) = emitter {
            let _ = emitter.emit_entry(entry);
        }
    });
}

/// Flush the process-wide sink, if any.
pub fn flush() -> std::io::Result<()> {
    with_sink(|emitter| emitter.map_or(Ok(()), LogEmitter::flush))
}

fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        duration.subsec_millis(),
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
