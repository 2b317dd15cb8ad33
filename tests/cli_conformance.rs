//! CLI conformance tests.
//!
//! Exercises argument handling through the real binary; nothing here
//! touches the network.

use std::process::Command;

/// Run gmharvest and get exit code
fn exit_code(args: &[&str]) -> i32 {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .env_remove("GROUPME_TOKEN")
        .output()
        .expect("Failed to execute gmharvest");

    output.status.code().unwrap_or(-1)
}

#[test]
fn help_exits_zero() {
    assert_eq!(exit_code(&["--help"]), 0);
}

#[test]
fn version_exits_zero() {
    assert_eq!(exit_code(&["--version"]), 0);
}

#[test]
fn unknown_flag_is_a_usage_error() {
    // clap returns 2 for usage errors
    assert_eq!(exit_code(&["--definitely-not-a-flag"]), 2);
}

#[test]
fn invalid_classifier_value_is_a_usage_error() {
    assert_eq!(exit_code(&["--classifier", "psychic"]), 2);
}
