//! Descriptor-owning byte stream.
//!
//! [`FdStream`] holds one OS descriptor and passes reads and writes
//! straight through to it. It tracks its own open/closed state, so `close`
//! is idempotent even though `close(2)` is not, and nothing reaches the OS
//! once the stream is closed.
//!
//! Handle and state live in atomics so the `'static` standard streams can
//! be shared; no lock is taken on the I/O path.

use std::fmt;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

use crate::error::{self, IoOp, StreamError};
use crate::policy::{self, HandlePolicy};
use crate::protocol::{self, Lines, RawStream};
use crate::structured_log::{self, LogEntry, LogLevel};
use crate::syscall;

/// Who is responsible for releasing the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Opened (or adopted) by the stream; `close` and `Drop` release it.
    Exclusive,
    /// Supplied by the caller as a raw integer; `close` ends this stream's
    /// use of it but never releases it.
    Borrowed,
    /// Process-lifetime standard handle; `close` is a no-op.
    Process,
}

impl Ownership {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Borrowed => "borrowed",
            Self::Process => "process",
        }
    }
}

/// First serial handed to dynamically created streams. Serials below this
/// are reserved for the standard streams.
const FIRST_DYNAMIC_ID: u64 = 16;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(FIRST_DYNAMIC_ID);

fn alloc_stream_id() -> u64 {
    NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed)
}

/// Unbuffered stream over an OS file descriptor.
pub struct FdStream {
    id: u64,
    handle: AtomicI32,
    closed: AtomicBool,
    ownership: Ownership,
    policy: &'static dyn HandlePolicy,
}

impl FdStream {
    pub(crate) fn new(
        handle: RawFd,
        ownership: Ownership,
        policy: &'static dyn HandlePolicy,
    ) -> Self {
        Self {
            id: alloc_stream_id(),
            handle: AtomicI32::new(handle),
            closed: AtomicBool::new(false),
            ownership,
            policy,
        }
    }

    /// Const constructor for the standard streams.
    pub(crate) const fn process(id: u64, handle: RawFd) -> Self {
        Self {
            id,
            handle: AtomicI32::new(handle),
            closed: AtomicBool::new(false),
            ownership: Ownership::Process,
            policy: &policy::RetainHandle,
        }
    }

    /// Wrap a descriptor the caller keeps responsibility for, using the
    /// configured handle policy.
    #[must_use]
    pub fn borrowed(handle: RawFd) -> Self {
        Self::new(handle, Ownership::Borrowed, policy::configured())
    }

    /// Process-unique serial, used to correlate log records.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    #[must_use]
    pub fn policy(&self) -> &'static dyn HandlePolicy {
        self.policy
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Raw handle value. After close this is whatever the handle policy
    /// retired it to.
    #[must_use]
    pub fn fileno(&self) -> RawFd {
        self.handle.load(Ordering::Acquire)
    }

    /// Handle to use for `op`, or `EBADF` if the stream may not touch the OS.
    fn live_handle(&self, op: IoOp) -> Result<RawFd, StreamError> {
        let fd = self.fileno();
        if self.is_closed() || !self.policy.admits(fd) {
            let err = error::bad_descriptor(op, fd);
            self.log_io_error(op, fd, err.code());
            return Err(err);
        }
        Ok(fd)
    }

    /// Unbuffered `read(2)`.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let fd = self.live_handle(IoOp::Read)?;
        match syscall::sys_read(fd, buf) {
            Ok(n) => {
                self.log_transfer(IoOp::Read, fd, n);
                Ok(n)
            }
            Err(code) => {
                self.log_io_error(IoOp::Read, fd, code);
                Err(error::io_error(IoOp::Read, fd, code))
            }
        }
    }

    /// Unbuffered `write(2)`; may accept fewer bytes than offered.
    pub fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        let fd = self.live_handle(IoOp::Write)?;
        match syscall::sys_write(fd, buf) {
            Ok(n) => {
                self.log_transfer(IoOp::Write, fd, n);
                Ok(n)
            }
            Err(code) => {
                self.log_io_error(IoOp::Write, fd, code);
                Err(error::io_error(IoOp::Write, fd, code))
            }
        }
    }

    /// Close the stream.
    ///
    /// Only the first call does any work. Exclusive streams release the
    /// descriptor; borrowed streams just stop using it; standard streams
    /// ignore the request. A failing `close(2)` is reported, but the stream
    /// is closed either way.
    pub fn close(&self) -> Result<(), StreamError> {
        if self.ownership == Ownership::Process {
            return Ok(());
        }
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let fd = self.handle.load(Ordering::Acquire);
        let released = match self.ownership {
            Ownership::Exclusive => syscall::sys_close(fd),
            Ownership::Borrowed | Ownership::Process => Ok(()),
        };
        self.handle
            .store(self.policy.retired_handle(fd), Ordering::Release);
        match released {
            Ok(()) => {
                self.log_event(LogLevel::Info, "close", fd, None);
                Ok(())
            }
            Err(code) => {
                self.log_event(LogLevel::Warn, "close_failed", fd, Some(code));
                Err(error::io_error(IoOp::Close, fd, code))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scoped use
    // -----------------------------------------------------------------------

    /// Scope entry: the stream itself.
    #[must_use]
    pub fn enter(&self) -> &Self {
        self
    }

    /// Scope exit: always closes, however the scope ended.
    pub fn exit(&self) -> Result<(), StreamError> {
        self.close()
    }

    /// Run `body` with the stream and close it afterwards, whether `body`
    /// returns `Ok`, returns `Err`, or panics.
    ///
    /// An error from `body` takes precedence over an error from closing.
    pub fn scoped<T, E, F>(self, body: F) -> Result<T, E>
    where
        F: FnOnce(&FdStream) -> Result<T, E>,
        E: From<StreamError>,
    {
        let guard = ExitGuard(&self);
        let outcome = body(guard.0.enter());
        std::mem::forget(guard);
        let closed = self.exit();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Protocol shortcuts
    // -----------------------------------------------------------------------

    /// Lazy line iterator over this stream.
    pub fn lines(&self) -> Lines<&Self> {
        protocol::lines(self)
    }

    pub fn readline(&self, limit: Option<usize>) -> Result<Vec<u8>, StreamError> {
        protocol::readline(self, limit)
    }

    pub fn readall(&self) -> Result<Vec<u8>, StreamError> {
        protocol::readall(self)
    }

    // -----------------------------------------------------------------------
    // Logging
    // -----------------------------------------------------------------------

    fn log_event(&self, level: LogLevel, event: &str, fd: RawFd, errno: Option<i32>) {
        if !structured_log::enabled(level) {
            return;
        }
        let mut entry = LogEntry::new(level, event)
            .with_stream(self.id, fd)
            .with_ownership(self.ownership.as_str());
        if let Some(code) = errno {
            entry = entry.with_errno(code);
        }
        structured_log::emit(entry);
    }

    fn log_io_error(&self, op: IoOp, fd: RawFd, code: i32) {
        if !structured_log::enabled(LogLevel::Warn) {
            return;
        }
        structured_log::emit(
            LogEntry::new(LogLevel::Warn, "io_error")
                .with_stream(self.id, fd)
                .with_op(op.as_str())
                .with_errno(code),
        );
    }

    fn log_transfer(&self, op: IoOp, fd: RawFd, bytes: usize) {
        if !structured_log::enabled(LogLevel::Trace) {
            return;
        }
        structured_log::emit(
            LogEntry::new(LogLevel::Trace, op.as_str())
                .with_stream(self.id, fd)
                .with_bytes(bytes),
        );
    }
}

struct ExitGuard<'a>(&'a FdStream);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.exit();
    }
}

impl Drop for FdStream {
    fn drop(&mut self) {
        if self.ownership != Ownership::Exclusive || self.is_closed() {
            return;
        }
        let fd = self.fileno();
        if self.close().is_ok() {
            self.log_event(LogLevel::Debug, "drop_close", fd, None);
        }
    }
}

impl RawStream for FdStream {
    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        FdStream::read(self, buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        FdStream::write(self, buf)
    }

    fn close(&self) -> Result<(), StreamError> {
        FdStream::close(self)
    }

    fn fileno(&self) -> RawFd {
        FdStream::fileno(self)
    }
}

impl From<OwnedFd> for FdStream {
    /// Adopt a descriptor; the stream becomes responsible for closing it.
    fn from(fd: OwnedFd) -> Self {
        Self::new(fd.into_raw_fd(), Ownership::Exclusive, policy::configured())
    }
}

impl AsRawFd for FdStream {
    fn as_raw_fd(&self) -> RawFd {
        self.fileno()
    }
}

impl fmt::Display for FdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<io.FileIO {}>", self.fileno())
    }
}

impl fmt::Debug for FdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FdStream")
            .field("id", &self.id)
            .field("fd", &self.fileno())
            .field("closed", &self.is_closed())
            .field("ownership", &self.ownership)
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl std::io::Read for &FdStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        FdStream::read(self, buf).map_err(Into::into)
    }
}

impl std::io::Write for &FdStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        FdStream::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Read for FdStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        FdStream::read(self, buf).map_err(Into::into)
    }
}

impl std::io::Write for FdStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        FdStream::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FdStream {
    type Item = Result<Vec<u8>, StreamError>;
    type IntoIter = Lines<&'a FdStream>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines()
    }
}
