//! End-to-end runs of the `fomon` binary.

use std::process::Command;

fn fomon() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fomon"))
}

#[test]
fn succeeds_when_program_succeeds() {
    let status = fomon()
        .args(["--interval", "0.01", "--timeout", "1", "--", "true"])
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn times_out_when_program_keeps_failing() {
    let output = fomon()
        .args(["-i", "0.01", "-t", "0.05", "--", "false"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Timed out"));
}

#[test]
fn passes_arguments_to_program() {
    let status = fomon()
        .args(["-t", "1", "-q", "--", "sh", "-c", "exit 0"])
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn missing_program_is_an_error() {
    let status = fomon()
        .args(["-t", "1", "--", "fomon-test-no-such-program"])
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn rejects_negative_interval() {
    let status = fomon()
        .args(["--interval=-1", "--", "true"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn rejects_zero_interval() {
    let output = fomon()
        .args(["-i", "0", "-t", "1", "--", "true"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("interval"), "{stderr}");
    assert!(!stderr.contains("Monitoring"), "logged before validating: {stderr}");
}

#[test]
fn rejects_zero_timeout() {
    let status = fomon()
        .args(["-i", "1", "-t", "0", "--", "true"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn piped_logs_are_plain() {
    let output = fomon()
        .env("RUST_LOG", "info")
        .args(["-t", "1", "--", "true"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Monitoring"), "{stderr}");
    assert!(!stderr.contains('\x1b'), "colour codes on a pipe: {stderr:?}");
    for line in stderr.lines() {
        assert!(
            !line.starts_with(|c: char| c.is_ascii_digit()),
            "timestamped line: {line}"
        );
    }
}
