//! Stream construction.
//!
//! [`open`] is the runtime's `open(target, mode="r")` builtin: a path is
//! opened through the OS with flags from [`crate::mode`], an integer is
//! wrapped as-is. [`Opener`] exposes the same operation with explicit
//! settings instead of the process configuration.

use std::ffi::CString;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::config::{self, RuntimeConfig};
use crate::errno;
use crate::error::{self, StreamError};
use crate::mode::{self, DEFAULT_MODE, ModeGrammar};
use crate::policy::HandlePolicy;
use crate::stream::{FdStream, Ownership};
use crate::structured_log::{self, LogEntry, LogLevel};
use crate::syscall;

/// Permission bits for files created by `open` (`rw-r--r--`).
pub const DEFAULT_PERMISSIONS: u32 = 0o644;

/// What to open: a filesystem path or an existing descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    Path(PathBuf),
    Fd(RawFd),
}

impl From<RawFd> for OpenTarget {
    fn from(fd: RawFd) -> Self {
        Self::Fd(fd)
    }
}

impl From<&str> for OpenTarget {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for OpenTarget {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<&Path> for OpenTarget {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for OpenTarget {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&PathBuf> for OpenTarget {
    fn from(path: &PathBuf) -> Self {
        Self::Path(path.clone())
    }
}

/// Open settings, defaulting to the process configuration.
#[derive(Debug, Clone, Copy)]
pub struct Opener {
    grammar: ModeGrammar,
    policy: &'static dyn HandlePolicy,
    permissions: u32,
}

impl Opener {
    #[must_use]
    pub fn from_config(cfg: &RuntimeConfig) -> Self {
        Self {
            grammar: cfg.mode_grammar,
            policy: cfg.handle_policy.resolve(),
            permissions: DEFAULT_PERMISSIONS,
        }
    }

    #[must_use]
    pub fn grammar(mut self, grammar: ModeGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: &'static dyn HandlePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Permission bits for newly created files (still subject to umask).
    #[must_use]
    pub fn permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Open `target`. Integer targets ignore `mode` and make no syscall.
    pub fn open(
        &self,
        target: impl Into<OpenTarget>,
        mode: Option<&str>,
    ) -> Result<FdStream, StreamError> {
        match target.into() {
            OpenTarget::Fd(fd) => Ok(self.wrap(fd)),
            OpenTarget::Path(path) => self.open_path(&path, mode),
        }
    }

    /// Wrap an existing descriptor without taking ownership of it.
    #[must_use]
    pub fn wrap(&self, fd: RawFd) -> FdStream {
        let stream = FdStream::new(fd, Ownership::Borrowed, self.policy);
        if structured_log::enabled(LogLevel::Debug) {
            structured_log::emit(
                LogEntry::new(LogLevel::Debug, "wrap")
                    .with_stream(stream.id(), fd)
                    .with_ownership(Ownership::Borrowed.as_str()),
            );
        }
        stream
    }

    fn open_path(&self, path: &Path, mode: Option<&str>) -> Result<FdStream, StreamError> {
        let mode_str = mode.unwrap_or(DEFAULT_MODE);
        let display = path.display().to_string();
        let flags = match mode::parse_mode(mode_str, self.grammar) {
            Ok(flags) => flags,
            Err(err) => {
                log_open_failure(&display, mode_str, None, err.code());
                return Err(err);
            }
        };
        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            log_open_failure(&display, mode_str, Some(flags.bits()), errno::EINVAL);
            return Err(error::open_error(display, errno::EINVAL));
        };
        match syscall::sys_open(&c_path, flags.os_bits(), self.permissions) {
            Ok(fd) => {
                let stream = FdStream::new(fd, Ownership::Exclusive, self.policy);
                if structured_log::enabled(LogLevel::Info) {
                    structured_log::emit(
                        LogEntry::new(LogLevel::Info, "open")
                            .with_stream(stream.id(), fd)
                            .with_path(display)
                            .with_mode(mode_str, Some(flags.bits()))
                            .with_ownership(Ownership::Exclusive.as_str())
                            .with_details(serde_json::json!({
                                "os_flags": flags.os_bits(),
                                "permissions": format!("{:o}", self.permissions),
                            })),
                    );
                }
                Ok(stream)
            }
            Err(code) => {
                log_open_failure(&display, mode_str, Some(flags.bits()), code);
                Err(error::open_error(display, code))
            }
        }
    }
}

impl Default for Opener {
    fn default() -> Self {
        Self::from_config(config::runtime())
    }
}

fn log_open_failure(path: &str, mode: &str, flags: Option<i32>, code: i32) {
    if structured_log::enabled(LogLevel::Warn) {
        structured_log::emit(
            LogEntry::new(LogLevel::Warn, "open_failed")
                .with_path(path)
                .with_mode(mode, flags)
                .with_errno(code),
        );
    }
}

/// Open a path or wrap a descriptor using the process configuration.
///
/// `mode` defaults to `"r"`.
pub fn open(target: impl Into<OpenTarget>, mode: Option<&str>) -> Result<FdStream, StreamError> {
    Opener::default().open(target, mode)
}
