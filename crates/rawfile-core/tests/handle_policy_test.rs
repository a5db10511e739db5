//! Integration test: every way of wrapping a descriptor picks up the
//! configured handle policy.
//!
//! The process configuration is read once, so the environment override is
//! checked by re-running this test binary with `RAWFILE_HANDLE_POLICY` set.
//!
//! Run: cargo test -p rawfile-core --test handle_policy_test

#![allow(unsafe_code)]

use std::os::fd::{FromRawFd, OwnedFd};
use std::process::Command;

use rawfile_core::config::ENV_HANDLE_POLICY;
use rawfile_core::policy::{self, SENTINEL_HANDLE};
use rawfile_core::{FdStream, open};

const CHILD_ENV: &str = "RAWFILE_POLICY_TEST_CHILD";

fn pipe() -> (OwnedFd, OwnedFd) {
    let mut fds = [0; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
}

/// Policy names for `open(int)`, `FdStream::borrowed` and `From<OwnedFd>`.
fn wrapping_policies() -> [&'static str; 3] {
    let (r, _w) = pipe();
    let via_open = open(5, None).unwrap().policy().name();
    let via_borrowed = FdStream::borrowed(5).policy().name();
    let via_adopt = FdStream::from(r).policy().name();
    [via_open, via_borrowed, via_adopt]
}

#[test]
fn wrapping_paths_agree_with_configuration() {
    let expected = policy::configured().name();
    let names = wrapping_policies();
    assert_eq!(names, [expected; 3]);
    if std::env::var_os(CHILD_ENV).is_some() {
        println!("policies={}", names.join(","));
    }
}

#[test]
fn sentinel_override_reaches_every_wrapping_path() {
    if std::env::var_os(CHILD_ENV).is_some() {
        return;
    }
    let out = Command::new(std::env::current_exe().unwrap())
        .args([
            "wrapping_paths_agree_with_configuration",
            "--exact",
            "--nocapture",
            "--test-threads=1",
        ])
        .env(CHILD_ENV, "1")
        .env(ENV_HANDLE_POLICY, "sentinel")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "stdout: {stdout}\nstderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(
        stdout.contains("policies=sentinel,sentinel,sentinel"),
        "stdout: {stdout}"
    );
}

#[test]
fn adopted_stream_retires_handle_per_policy() {
    let (r, _w) = pipe();
    let stream = FdStream::from(r);
    let raw = stream.fileno();
    stream.close().unwrap();
    let expected = if policy::configured().name() == "sentinel" {
        SENTINEL_HANDLE
    } else {
        raw
    };
    assert_eq!(stream.fileno(), expected);
}
