//! Integration test: scoped use closes exactly once, verified from the
//! structured log.
//!
//! One shared in-memory sink is installed for the whole test binary; each
//! test filters records by the serial of the stream it created.
//!
//! Run: cargo test -p rawfile-core --test scoped_close_test

use std::path::PathBuf;
use std::sync::OnceLock;

use rawfile_core::errno;
use rawfile_core::error::{IoOp, io_error};
use rawfile_core::structured_log::{self, LogEmitter, LogEntry, LogLevel, SharedBuffer};
use rawfile_core::{FdStream, StreamError, open, stderr};

fn log_buffer() -> &'static SharedBuffer {
    static BUFFER: OnceLock<SharedBuffer> = OnceLock::new();
    BUFFER.get_or_init(|| {
        let (emitter, buffer) = LogEmitter::to_shared_buffer(LogLevel::Debug);
        structured_log::install(Some(emitter));
        buffer
    })
}

fn events_for(stream_id: u64) -> Vec<LogEntry> {
    log_buffer()
        .entries()
        .into_iter()
        .filter(|e| e.stream_id == Some(stream_id))
        .collect()
}

fn count(stream_id: u64, event: &str) -> usize {
    events_for(stream_id)
        .iter()
        .filter(|e| e.event == event)
        .count()
}

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("rawfile_scoped_{tag}_{}", std::process::id()))
}

fn fresh_stream(tag: &str) -> (FdStream, PathBuf) {
    log_buffer();
    let path = temp_path(tag);
    let stream = open(&path, Some("w+")).expect("open temp file");
    (stream, path)
}

#[test]
fn error_in_scope_closes_exactly_once() {
    let (stream, path) = fresh_stream("error");
    let id = stream.id();

    let result: Result<(), StreamError> =
        stream.scoped(|s| Err(io_error(IoOp::Read, s.fileno(), errno::EIO)));

    let err = result.unwrap_err();
    assert_eq!(err.code(), errno::EIO, "body error must propagate unchanged");
    assert_eq!(count(id, "close"), 1);
    assert_eq!(count(id, "drop_close"), 0);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn successful_scope_closes_exactly_once() {
    let (stream, path) = fresh_stream("ok");
    let id = stream.id();

    let written = stream.scoped(|s| s.write(b"scoped")).unwrap();
    assert_eq!(written, 6);
    assert_eq!(count(id, "close"), 1);

    let reread = open(&path, None).unwrap();
    assert_eq!(reread.readall().unwrap(), b"scoped");
    std::fs::remove_file(path).unwrap();
}

#[test]
fn panic_in_scope_still_closes() {
    let (stream, path) = fresh_stream("panic");
    let id = stream.id();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        let _: Result<(), StreamError> = stream.scoped(|_| panic!("scope body failed"));
    }));

    assert!(outcome.is_err());
    assert_eq!(count(id, "close"), 1);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn explicit_close_inside_scope_is_not_repeated() {
    let (stream, path) = fresh_stream("inner_close");
    let id = stream.id();

    stream
        .scoped(|s| {
            s.close()?;
            s.close()?;
            Ok::<_, StreamError>(())
        })
        .unwrap();

    assert_eq!(count(id, "close"), 1);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn dropping_unclosed_stream_logs_drop_close() {
    let (stream, path) = fresh_stream("drop");
    let id = stream.id();
    drop(stream);

    assert_eq!(count(id, "close"), 1);
    assert_eq!(count(id, "drop_close"), 1);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn open_record_carries_mode_and_ownership() {
    let (stream, path) = fresh_stream("open_record");
    let id = stream.id();

    let events = events_for(id);
    let opened = events
        .iter()
        .find(|e| e.event == "open")
        .expect("open event recorded");
    assert_eq!(opened.mode.as_deref(), Some("w+"));
    assert_eq!(opened.ownership.as_deref(), Some("exclusive"));
    assert_eq!(opened.fd, Some(stream.fileno()));
    assert!(!opened.trace_id.is_empty());
    let details = opened.details.as_ref().expect("open details");
    assert_eq!(details["permissions"], "644");
    assert_eq!(details["os_flags"], libc::O_RDWR | libc::O_CREAT | libc::O_TRUNC);

    stream.close().unwrap();
    std::fs::remove_file(path).unwrap();
}

#[test]
fn failed_open_is_logged_with_errno() {
    log_buffer();
    let missing = "/definitely/missing/scoped/path";
    let err = open(missing, Some("r")).unwrap_err();
    assert_eq!(err.code(), errno::ENOENT);

    let failures: Vec<_> = log_buffer()
        .entries()
        .into_iter()
        .filter(|e| e.event == "open_failed" && e.path.as_deref() == Some(missing))
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].errno, Some(errno::ENOENT));
    assert_eq!(failures[0].level, LogLevel::Warn);
}

#[test]
fn io_after_close_is_logged() {
    let (stream, path) = fresh_stream("after_close");
    let id = stream.id();
    stream.close().unwrap();

    assert_eq!(stream.write(b"x").unwrap_err().code(), errno::EBADF);
    let errors: Vec<_> = events_for(id)
        .into_iter()
        .filter(|e| e.event == "io_error")
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].op.as_deref(), Some("write"));
    assert_eq!(errors[0].errno, Some(errno::EBADF));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn standard_stream_close_logs_nothing() {
    log_buffer();
    stderr().close().unwrap();
    assert_eq!(count(stderr().id(), "close"), 0);
    assert!(!stderr().is_closed());
}
