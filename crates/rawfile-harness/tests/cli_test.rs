//! Integration test: the harness binary end to end.
//!
//! Run: cargo test -p rawfile-harness --test cli_test

use std::path::PathBuf;
use std::process::{Command, Output};

fn harness(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rawfile-harness"))
        .args(args)
        .env_remove("RAWFILE_LOG")
        .env_remove("RAWFILE_MODE_GRAMMAR")
        .output()
        .expect("spawn harness")
}

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("rawfile_cli_{tag}_{}", std::process::id()))
}

#[test]
fn flags_prints_json() {
    let out = harness(&["flags", "w+"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["mode"], "w+");
    assert_eq!(report["readable"], true);
    assert_eq!(report["writable"], true);
    assert_eq!(report["symbolic"], "O_RDWR|O_CREAT|O_TRUNC");
}

#[test]
fn flags_rejects_unknown_character_unless_compat() {
    let strict = harness(&["flags", "rx"]);
    assert_eq!(strict.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&strict.stderr);
    assert!(stderr.starts_with("error: "), "stderr: {stderr}");
    assert!(stderr.contains("'x'"));

    let compat = harness(&["flags", "rx", "--compat"]);
    assert!(compat.status.success());
    let report: serde_json::Value = serde_json::from_slice(&compat.stdout).unwrap();
    assert_eq!(report["grammar"], "compat");
    assert_eq!(report["writable"], false);
}

#[test]
fn write_then_cat() {
    let path = temp_path("write_cat");
    let path_str = path.to_str().unwrap();

    let written = harness(&["write", path_str, "alpha\nbeta\n"]);
    assert!(written.status.success());
    let report: serde_json::Value = serde_json::from_slice(&written.stdout).unwrap();
    assert_eq!(report["bytes"], 11);

    let appended = harness(&["write", path_str, "gamma", "--mode", "a+"]);
    assert!(appended.status.success());

    let plain = harness(&["cat", path_str]);
    assert_eq!(plain.stdout, b"alpha\nbeta\ngamma");

    let numbered = harness(&["cat", path_str, "--lines"]);
    assert_eq!(
        String::from_utf8(numbered.stdout).unwrap(),
        "     1\talpha\n     2\tbeta\n     3\tgamma"
    );
    std::fs::remove_file(path).unwrap();
}

#[test]
fn copy_and_log() {
    let src = temp_path("copy_src");
    let dst = temp_path("copy_dst");
    let log = temp_path("copy_log.jsonl");
    std::fs::write(&src, b"copied bytes").unwrap();

    let out = harness(&[
        "--log",
        log.to_str().unwrap(),
        "copy",
        src.to_str().unwrap(),
        dst.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(std::fs::read(&dst).unwrap(), b"copied bytes");

    let events: Vec<serde_json::Value> = std::fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let opens = events.iter().filter(|e| e["event"] == "open").count();
    let closes = events.iter().filter(|e| e["event"] == "close").count();
    assert_eq!(opens, 2);
    assert_eq!(closes, 2);

    for path in [src, dst, log] {
        std::fs::remove_file(path).unwrap();
    }
}

#[test]
fn missing_input_exits_nonzero_with_errno() {
    let out = harness(&["cat", "/definitely/missing/input"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let expected = format!("[Errno {}]", rawfile_core::errno::ENOENT);
    assert!(stderr.contains(&expected), "stderr: {stderr}");
    assert!(out.stdout.is_empty());
}
