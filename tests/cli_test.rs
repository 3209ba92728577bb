//! Command line tests against the built binary

use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

#[test]
fn test_process_reads_message_from_stdin() {
    let dir = TempDir::new().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_bugmonitor"))
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--db-path")
        .arg(dir.path().join("ranking.db"))
        .arg("process")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start bugmonitor");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"From: newsletter@example.org\r\nSubject: [Bug 1] hello\r\n\r\nbody")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["ignored"], 1);
    assert_eq!(report["processed"], 0);
}
