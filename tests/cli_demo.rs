//! CLI integration tests for the demo mode.

use std::process::Command;

fn summary_value<'a>(stdout: &'a str, key: &str) -> &'a str {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(key))
        .unwrap_or_else(|| panic!("{key} line missing"))
        .trim()
}

#[test]
fn demo_cli_delivers_everything_without_oven_overflow() {
    let bin = env!("CARGO_BIN_EXE_oven_rush");
    // No subcommand runs the demo with default settings.
    let output = Command::new(bin)
        .output()
        .expect("failed to run demo binary");

    assert!(
        output.status.success(),
        "demo exited with non-zero status: {:?}",
        output.status
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("DEMO SUMMARY"),
        "demo summary missing from output"
    );
    assert_eq!(summary_value(&stdout, "outcome="), "completed");
    assert_eq!(summary_value(&stdout, "oven_overflow="), "false");
    assert_eq!(summary_value(&stdout, "acknowledged="), "true");
    assert_eq!(summary_value(&stdout, "orders_delivered="), "12");
}

#[test]
fn demo_subcommand_honours_order_count() {
    let bin = env!("CARGO_BIN_EXE_oven_rush");
    let output = Command::new(bin)
        .args(["demo", "--orders", "5", "--seed", "7"])
        .output()
        .expect("failed to run demo binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(summary_value(&stdout, "orders_delivered="), "5");
}

#[test]
fn serve_rejects_privileged_port() {
    let bin = env!("CARGO_BIN_EXE_oven_rush");
    let output = Command::new(bin)
        .args(["serve", "80", "2", "2", "1"])
        .output()
        .expect("failed to run binary");

    assert!(!output.status.success());
}
