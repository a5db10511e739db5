//! Standard process streams.
//!
//! stdin/stdout/stderr exist from the start of the process as statics over
//! descriptors 0, 1 and 2. They behave like any other [`FdStream`] except
//! that `close` leaves them open: the process may still need those
//! descriptors elsewhere.

use std::os::fd::RawFd;

use crate::stream::FdStream;

pub const STDIN_FILENO: RawFd = libc::STDIN_FILENO;
pub const STDOUT_FILENO: RawFd = libc::STDOUT_FILENO;
pub const STDERR_FILENO: RawFd = libc::STDERR_FILENO;

static STDIN: FdStream = FdStream::process(0, STDIN_FILENO);
static STDOUT: FdStream = FdStream::process(1, STDOUT_FILENO);
static STDERR: FdStream = FdStream::process(2, STDERR_FILENO);

/// The three conventional process streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardStream {
    Input,
    Output,
    Error,
}

impl StandardStream {
    pub const ALL: [Self; 3] = [Self::Input, Self::Output, Self::Error];

    #[must_use]
    pub const fn fileno(self) -> RawFd {
        match self {
            Self::Input => STDIN_FILENO,
            Self::Output => STDOUT_FILENO,
            Self::Error => STDERR_FILENO,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "stdin",
            Self::Output => "stdout",
            Self::Error => "stderr",
        }
    }
}

/// Stream for one of the standard descriptors.
#[must_use]
pub fn standard(which: StandardStream) -> &'static FdStream {
    match which {
        StandardStream::Input => &STDIN,
        StandardStream::Output => &STDOUT,
        StandardStream::Error => &STDERR,
    }
}

#[must_use]
pub fn stdin() -> &'static FdStream {
    &STDIN
}

#[must_use]
pub fn stdout() -> &'static FdStream {
    &STDOUT
}

#[must_use]
pub fn stderr() -> &'static FdStream {
    &STDERR
}
