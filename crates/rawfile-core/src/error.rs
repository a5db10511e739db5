//! OS failure translation.
//!
//! Every failing syscall ends up here. The raw errno is wrapped in an
//! [`OsError`] and classified by the phase that failed: opening a stream
//! (construction) or operating on an existing one (I/O). No other module
//! builds these values directly.

use std::fmt;
use std::os::fd::RawFd;

use thiserror::Error;

use crate::errno;

/// Raw platform error code from a failing syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("[Errno {code}] {}", errno::describe(*code))]
pub struct OsError {
    pub code: i32,
}

impl OsError {
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self { code }
    }

    /// Capture the calling thread's last OS error.
    #[must_use]
    pub fn last() -> Self {
        Self::new(errno::last_os_errno(errno::EIO))
    }
}

/// Stream operation that reached (or tried to reach) the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoOp {
    Read,
    Write,
    Close,
}

impl IoOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `open` failed; no stream was created.
    Construction,
    /// read/write/close on an existing stream failed.
    Io,
}

/// Error surfaced by every fallible stream operation.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("cannot open {path:?}: {source}")]
    Open {
        path: String,
        #[source]
        source: OsError,
    },
    #[error("invalid mode {mode:?}: unrecognized character {ch:?}")]
    InvalidMode { mode: String, ch: char },
    #[error("{op} on fd {fd} failed: {source}")]
    Io {
        op: IoOp,
        fd: RawFd,
        #[source]
        source: OsError,
    },
}

impl StreamError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Open { .. } | Self::InvalidMode { .. } => ErrorKind::Construction,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Platform error code carried by this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Open { source, .. } | Self::Io { source, .. } => source.code,
            Self::InvalidMode { .. } => errno::EINVAL,
        }
    }

    #[must_use]
    pub fn is_construction(&self) -> bool {
        self.kind() == ErrorKind::Construction
    }
}

/// Translate an open-time errno into a construction error.
#[must_use]
pub fn open_error(path: impl Into<String>, code: i32) -> StreamError {
    StreamError::Open {
        path: path.into(),
        source: OsError::new(code),
    }
}

/// Reject a mode string at the first character outside the alphabet.
#[must_use]
pub fn invalid_mode(mode: impl Into<String>, ch: char) -> StreamError {
    StreamError::InvalidMode {
        mode: mode.into(),
        ch,
    }
}

/// Translate a post-construction errno into an I/O error.
#[must_use]
pub fn io_error(op: IoOp, fd: RawFd, code: i32) -> StreamError {
    StreamError::Io {
        op,
        fd,
        source: OsError::new(code),
    }
}

/// The error used for operations rejected before reaching the OS.
#[must_use]
pub fn bad_descriptor(op: IoOp, fd: RawFd) -> StreamError {
    io_error(op, fd, errno::EBADF)
}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        let code = err.code();
        Self::new(Self::from_raw_os_error(code).kind(), err)
    }
}
