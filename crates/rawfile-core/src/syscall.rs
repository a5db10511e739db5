//! Syscall veneer.
//!
//! Typed wrappers around the host's `open`, `read`, `write` and `close`.
//! Each returns `Ok(value)` or `Err(errno)` captured immediately after the
//! failing call, and none of them retries: `EINTR` is handed back to the
//! caller like any other code.

use std::ffi::CStr;
use std::os::fd::RawFd;

use libc::{c_int, c_void};

use crate::errno;

/// Convert a raw `-1`-on-failure return into `Result<value, errno>`.
#[inline]
fn check(ret: isize) -> Result<usize, i32> {
    if ret < 0 {
        Err(errno::last_os_errno(errno::EIO))
    } else {
        Ok(ret as usize)
    }
}

/// `open(path, flags, mode)`.
#[inline]
pub fn sys_open(path: &CStr, flags: c_int, mode: u32) -> Result<RawFd, i32> {
    // SAFETY: `path` is a valid NUL-terminated string for the whole call.
    let ret = unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) };
    check(ret as isize).map(|fd| fd as RawFd)
}

/// `read(fd, buf, buf.len())`.
#[inline]
pub fn sys_read(fd: RawFd, buf: &mut [u8]) -> Result<usize, i32> {
    // SAFETY: the slice is valid for writes of `buf.len()` bytes.
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr().cast::<c_void>(), buf.len()) };
    check(ret as isize)
}

/// `write(fd, buf, buf.len())`.
#[inline]
pub fn sys_write(fd: RawFd, buf: &[u8]) -> Result<usize, i32> {
    // SAFETY: the slice is valid for reads of `buf.len()` bytes.
    let ret = unsafe { libc::write(fd, buf.as_ptr().cast::<c_void>(), buf.len()) };
    check(ret as isize)
}

/// `close(fd)`.
#[inline]
pub fn sys_close(fd: RawFd) -> Result<(), i32> {
    // SAFETY: close takes no pointers; a bad fd only yields EBADF.
    let ret = unsafe { libc::close(fd) };
    check(ret as isize).map(|_| ())
}
