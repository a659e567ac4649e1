//! CLI integration tests

use std::process::{Command, Output};

fn tonnage(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tonnage"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = tonnage(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Kubernetes cluster capacity inventory"),
        "Should show about text"
    );
    assert!(stdout.contains("--kubeconfig"), "Should show kubeconfig flag");
    assert!(stdout.contains("--context"), "Should show context flag");
    assert!(stdout.contains("--node-selector"), "Should show node selector");
    assert!(stdout.contains("--pod-selector"), "Should show pod selector");
    assert!(stdout.contains("--include-pods"), "Should show include-pods");
    assert!(stdout.contains("--summary"), "Should show summary");
    assert!(stdout.contains("--format"), "Should show format");
    assert!(stdout.contains("--no-progress"), "Should show no-progress");
}

/// Test that help states the units of the figures
#[test]
fn test_cli_help_states_units() {
    let output = tonnage(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("millicores"), "Should name the CPU unit");
    assert!(
        stdout.contains("mebibytes (MiB, 2^20 bytes)"),
        "Should name the memory unit"
    );
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = tonnage(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("tonnage"), "Should show binary name");
}

/// Summary and per-pod detail are mutually exclusive
#[test]
fn test_summary_conflicts_with_include_pods() {
    let output = tonnage(&["-s", "-p"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Conflicting flags should fail");
    assert!(
        stderr.contains("cannot be used with"),
        "Should explain the conflict: {stderr}"
    );
    assert!(output.stdout.is_empty(), "Should not print a report");
}

/// Long forms conflict the same way
#[test]
fn test_long_flags_conflict() {
    let output = tonnage(&["--include-pods", "--summary"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

/// Test invalid format value
#[test]
fn test_invalid_format() {
    let output = tonnage(&["--format", "yaml"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown format should fail");
    assert!(stderr.contains("yaml"), "Should name the bad value");
}

/// An unreadable kubeconfig fails before any report is printed
#[test]
fn test_missing_kubeconfig_fails() {
    let output = tonnage(&[
        "--kubeconfig",
        "/nonexistent/tonnage/kubeconfig",
        "--no-progress",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Missing kubeconfig should fail");
    assert!(
        stderr.contains("Error creating kube client"),
        "Should report the connection failure: {stderr}"
    );
    assert!(output.stdout.is_empty(), "Should not print a report");
}
