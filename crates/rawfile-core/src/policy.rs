//! Handle validity policy.
//!
//! Decides what a stream's recorded handle becomes after `close`, and
//! whether a recorded handle may be handed to the OS at all. POSIX hosts
//! keep the old number around for introspection. Hosts whose C runtime
//! faults on stale descriptors (the Windows CRT) overwrite it with
//! [`SENTINEL_HANDLE`] and reject it before any syscall.

use std::fmt;
use std::os::fd::RawFd;

/// Handle value meaning "no descriptor".
pub const SENTINEL_HANDLE: RawFd = -1;

/// Strategy consulted by [`crate::FdStream`] around close and I/O.
pub trait HandlePolicy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Handle value to record once `handle` has been closed.
    fn retired_handle(&self, handle: RawFd) -> RawFd;

    /// Whether an operation on `handle` may reach the OS.
    fn admits(&self, handle: RawFd) -> bool;
}

/// Keep the descriptor number after close; let the OS judge every handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetainHandle;

impl HandlePolicy for RetainHandle {
    fn name(&self) -> &'static str {
        "retain"
    }

    fn retired_handle(&self, handle: RawFd) -> RawFd {
        handle
    }

    fn admits(&self, _handle: RawFd) -> bool {
        true
    }
}

/// Overwrite the handle with [`SENTINEL_HANDLE`] on close and refuse to
/// pass sentinel handles to the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelHandle;

impl HandlePolicy for SentinelHandle {
    fn name(&self) -> &'static str {
        "sentinel"
    }

    fn retired_handle(&self, _handle: RawFd) -> RawFd {
        SENTINEL_HANDLE
    }

    fn admits(&self, handle: RawFd) -> bool {
        handle != SENTINEL_HANDLE
    }
}

pub static RETAIN: RetainHandle = RetainHandle;
pub static SENTINEL: SentinelHandle = SentinelHandle;

/// Policy matching the host's C runtime.
///
/// The crate currently builds only for unix targets, where this is always
/// [`RetainHandle`]; [`SentinelHandle`] is reached there only through
/// `RAWFILE_HANDLE_POLICY` or an explicit [`crate::Opener::policy`].
#[must_use]
pub fn native() -> &'static dyn HandlePolicy {
    if cfg!(windows) { &SENTINEL } else { &RETAIN }
}

/// Policy selected by the process configuration.
#[must_use]
pub fn configured() -> &'static dyn HandlePolicy {
    crate::config::runtime().handle_policy.resolve()
}

/// Configured policy choice.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyChoice {
    #[default]
    Native,
    Retain,
    Sentinel,
}

impl PolicyChoice {
    /// Parse from string (case-insensitive). Unknown values map to `Native`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" | "posix" | "keep" => Self::Retain,
            "sentinel" | "crt" | "msvc" => Self::Sentinel,
            _ => Self::Native,
        }
    }

    #[must_use]
    pub fn resolve(self) -> &'static dyn HandlePolicy {
        match self {
            Self::Native => native(),
            Self::Retain => &RETAIN,
            Self::Sentinel => &SENTINEL,
        }
    }
}
