//! Error number definitions.
//!
//! Named host errno values for the codes this crate produces or tests
//! against, plus capture of the calling thread's last OS error.

pub const ENOENT: i32 = libc::ENOENT;
pub const EINTR: i32 = libc::EINTR;
pub const EIO: i32 = libc::EIO;
pub const EBADF: i32 = libc::EBADF;
pub const EACCES: i32 = libc::EACCES;
pub const EISDIR: i32 = libc::EISDIR;
pub const EINVAL: i32 = libc::EINVAL;
pub const EPIPE: i32 = libc::EPIPE;

/// Returns the errno left behind by the last failed OS call on this thread.
///
/// Falls back to `default_errno` when the host reports no code.
#[inline]
pub fn last_os_errno(default_errno: i32) -> i32 {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(default_errno)
}

/// Human-readable description of an errno value, as the host reports it.
pub fn describe(code: i32) -> String {
    let text = std::io::Error::from_raw_os_error(code).to_string();
    // io::Error appends " (os error N)"; the code is rendered separately.
    match text.rfind(" (os error ") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}
