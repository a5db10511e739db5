//! Integration test: the standard streams write to their own descriptors.
//!
//! A child copy of this test binary writes through `stdout()` and
//! `stderr()`; the parent captures both pipes and checks each payload
//! arrived only where it was sent.
//!
//! Run: cargo test -p rawfile-core --test std_streams_test

use std::io::Write;
use std::process::Command;

use rawfile_core::{StandardStream, stderr, stdin, stdout};

const CHILD_ENV: &str = "RAWFILE_STD_STREAMS_TEST_CHILD";

#[test]
fn child_writes_through_standard_streams() {
    if std::env::var_os(CHILD_ENV).is_none() {
        return;
    }
    let mut out = stdout();
    let mut err = stderr();
    out.write_all(b"OUTPUT-PAYLOAD\n").unwrap();
    err.write_all(b"ERROR-PAYLOAD\n").unwrap();
    stderr().close().unwrap();
    out.write_all(b"OUTPUT-AFTER-CLOSE\n").unwrap();
    err.write_all(b"ERROR-AFTER-CLOSE\n").unwrap();
}

#[test]
fn writes_land_only_on_their_own_stream() {
    if std::env::var_os(CHILD_ENV).is_some() {
        return;
    }
    let out = Command::new(std::env::current_exe().unwrap())
        .args([
            "child_writes_through_standard_streams",
            "--exact",
            "--nocapture",
            "--test-threads=1",
        ])
        .env(CHILD_ENV, "1")
        .output()
        .unwrap();
    let child_out = String::from_utf8_lossy(&out.stdout);
    let child_err = String::from_utf8_lossy(&out.stderr);
    assert!(out.status.success(), "stdout: {child_out}\nstderr: {child_err}");

    assert!(child_out.contains("OUTPUT-PAYLOAD"), "stdout: {child_out}");
    assert!(child_out.contains("OUTPUT-AFTER-CLOSE"), "stdout: {child_out}");
    assert!(!child_out.contains("ERROR-"), "stdout: {child_out}");

    assert!(child_err.contains("ERROR-PAYLOAD"), "stderr: {child_err}");
    assert!(child_err.contains("ERROR-AFTER-CLOSE"), "stderr: {child_err}");
    assert!(!child_err.contains("OUTPUT-"), "stderr: {child_err}");
}

#[test]
fn registry_exposes_distinct_conventional_handles() {
    let handles: Vec<_> = StandardStream::ALL
        .iter()
        .map(|which| rawfile_core::std_streams::standard(*which).fileno())
        .collect();
    assert_eq!(handles, vec![0, 1, 2]);
    assert_eq!(stdin().fileno(), 0);
    assert!(!std::ptr::eq(stdout(), stderr()));
}
