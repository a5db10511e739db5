//! Open-mode parsing.
//!
//! Translates a textual access mode (`"r"`, `"w+"`, `"a"`, ...) into the
//! flag word handed to `open(2)`. Each character contributes a fixed set of
//! bits and the result is their union, so order and repetition never matter:
//!
//! | char | flags |
//! |------|-------|
//! | `r`  | `O_RDONLY` |
//! | `w`  | `O_WRONLY \| O_CREAT \| O_TRUNC` |
//! | `a`  | `O_APPEND` |
//! | `+`  | `O_RDWR` |
//!
//! [`OpenFlags::bits`] is that raw union. On hosts where `O_RDWR` is not
//! `O_RDONLY | O_WRONLY` (Linux among them) a mode such as `"w+"` unions to
//! both write-access bits, which the kernel would treat as an ioctl-only
//! access mode; [`OpenFlags::os_bits`] collapses that pair to `O_RDWR`
//! before the flags reach `open(2)`.
//!
//! `"a"` on its own opens read-only with append set; callers wanting to
//! append must also ask for write access (`"wa"`, `"a+"`).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use libc::c_int;

use crate::error::{self, StreamError};

/// Mode used when the caller supplies none.
pub const DEFAULT_MODE: &str = "r";

/// OS open flags derived from a mode string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OpenFlags(c_int);

impl OpenFlags {
    pub const READ: Self = Self(libc::O_RDONLY);
    pub const WRITE: Self = Self(libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC);
    pub const APPEND: Self = Self(libc::O_APPEND);
    pub const UPDATE: Self = Self(libc::O_RDWR);

    #[must_use]
    pub const fn bits(self) -> c_int {
        self.0
    }

    /// Flag word passed to `open(2)`.
    #[must_use]
    pub const fn os_bits(self) -> c_int {
        (self.0 & !libc::O_ACCMODE) | self.access_mode()
    }

    /// Normalized access mode: one of `O_RDONLY`, `O_WRONLY`, `O_RDWR`.
    #[must_use]
    pub const fn access_mode(self) -> c_int {
        let acc = self.0 & libc::O_ACCMODE;
        if acc & libc::O_RDWR != 0 {
            libc::O_RDWR
        } else {
            acc
        }
    }

    #[must_use]
    pub const fn is_readable(self) -> bool {
        self.access_mode() != libc::O_WRONLY
    }

    #[must_use]
    pub const fn is_writable(self) -> bool {
        self.access_mode() != libc::O_RDONLY
    }

    #[must_use]
    pub const fn creates(self) -> bool {
        self.0 & libc::O_CREAT != 0
    }

    #[must_use]
    pub const fn truncates(self) -> bool {
        self.0 & libc::O_TRUNC != 0
    }

    #[must_use]
    pub const fn appends(self) -> bool {
        self.0 & libc::O_APPEND != 0
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for OpenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = match self.access_mode() {
            libc::O_WRONLY => "O_WRONLY",
            libc::O_RDWR => "O_RDWR",
            _ => "O_RDONLY",
        };
        f.write_str(access)?;
        if self.creates() {
            f.write_str("|O_CREAT")?;
        }
        if self.truncates() {
            f.write_str("|O_TRUNC")?;
        }
        if self.appends() {
            f.write_str("|O_APPEND")?;
        }
        Ok(())
    }
}

/// How characters outside the mode alphabet are handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeGrammar {
    /// Reject unknown characters with [`StreamError::InvalidMode`].
    #[default]
    Strict,
    /// Ignore unknown characters.
    Compat,
}

impl ModeGrammar {
    /// Parse from string (case-insensitive). Unknown values map to `Strict`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "compat" | "lenient" | "legacy" | "ignore" => Self::Compat,
            _ => Self::Strict,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Compat => "compat",
        }
    }
}

/// Flags contributed by a single mode character.
///
/// `b` and `t` are accepted with no effect: every stream is a byte stream.
#[must_use]
pub fn char_flags(ch: char) -> Option<OpenFlags> {
    match ch {
        'r' => Some(OpenFlags::READ),
        'w' => Some(OpenFlags::WRITE),
        'a' => Some(OpenFlags::APPEND),
        '+' => Some(OpenFlags::UPDATE),
        'b' | 't' => Some(OpenFlags::default()),
        _ => None,
    }
}

/// Parse a mode string into open flags.
pub fn parse_mode(mode: &str, grammar: ModeGrammar) -> Result<OpenFlags, StreamError> {
    let mut flags = OpenFlags::default();
    for ch in mode.chars() {
        match (char_flags(ch), grammar) {
            (Some(bits), _) => flags |= bits,
            (None, ModeGrammar::Compat) => {}
            (None, ModeGrammar::Strict) => {
                return Err(error::invalid_mode(mode, ch));
            }
        }
    }
    Ok(flags)
}

/// Parse an optional mode, defaulting to [`DEFAULT_MODE`].
pub fn parse_mode_or_default(
    mode: Option<&str>,
    grammar: ModeGrammar,
) -> Result<OpenFlags, StreamError> {
    parse_mode(mode.unwrap_or(DEFAULT_MODE), grammar)
}
