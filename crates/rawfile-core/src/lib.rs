//! # rawfile-core
//!
//! Unbuffered byte streams over OS file descriptors, for embedding in a
//! managed runtime.
//!
//! # Architecture
//!
//! ```text
//! open(target, mode) -> mode::parse_mode -> syscall::sys_open -> FdStream
//!                                  \                  \
//!                                   `-> error (construction)   `-> error (I/O)
//! FdStream::{read, write} -> syscall::{sys_read, sys_write}
//! protocol::{readall, readline, lines} -> RawStream::{read, write}
//! ```
//!
//! The standard streams live in [`std_streams`] and bypass `open`.
//! Only [`syscall`] contains `unsafe` code.

#![deny(unsafe_code)]

pub mod config;
pub mod errno;
pub mod error;
pub mod mode;
pub mod open;
pub mod policy;
pub mod protocol;
pub mod std_streams;
pub mod stream;
pub mod structured_log;
#[allow(unsafe_code)]
pub mod syscall;

pub use error::{ErrorKind, IoOp, OsError, StreamError};
pub use mode::{ModeGrammar, OpenFlags, parse_mode};
pub use open::{OpenTarget, Opener, open};
pub use policy::HandlePolicy;
pub use protocol::{Lines, RawStream};
pub use std_streams::{StandardStream, stderr, stdin, stdout};
pub use stream::{FdStream, Ownership};
