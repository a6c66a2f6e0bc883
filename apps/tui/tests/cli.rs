//! CLI integration tests against the built `tradeflow` binary

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use tempfile::tempdir;

fn tradeflow() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tradeflow"))
}

#[test]
fn test_cli_help() {
    tradeflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--flows"));
}

#[test]
fn test_cli_version() {
    tradeflow().arg("--version").assert().success();
}

#[test]
fn test_headless_demo_prints_svg() {
    tradeflow()
        .args(["--headless", "--demo"])
        .assert()
        .success()
        .stdout(contains("<svg").and(contains("class=\"flow-connection\"")))
        .stdout(contains("$500B"));
}

#[test]
fn test_headless_without_flows_has_empty_layer() {
    tradeflow()
        .arg("--headless")
        .assert()
        .success()
        .stdout(contains("class=\"trade-flows\"/>"));
}

#[test]
fn test_json_summary_from_flows_file() {
    let dir = tempdir().unwrap();
    let flows = dir.path().join("flows.json");
    fs::write(
        &flows,
        r#"[
            {"from": "840", "to": "156", "value": 500000},
            {"reporterCode": 276, "partnerCode": 250, "tradeValue": 230000},
            {"from": "ZZZ", "to": "840", "value": 1}
        ]"#,
    )
    .unwrap();

    let output = tradeflow()
        .args(["--json", "--flows"])
        .arg(&flows)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["flows"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["flows"][0]["label"], "$500K");
    assert_eq!(report["flows"][1]["from"], "276");
}

#[test]
fn test_output_writes_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("map.svg");

    tradeflow()
        .args(["--demo", "--show-labels", "--output"])
        .arg(&out)
        .assert()
        .success();

    let svg = fs::read_to_string(out).unwrap();
    assert!(svg.contains(">Germany</text>"));
    assert_eq!(svg.matches("class=\"flow-marker-group\"").count(), 5);
}

#[test]
fn test_invalid_speed_fails() {
    tradeflow()
        .args(["--headless", "--speed", "0"])
        .assert()
        .failure()
        .stderr(contains("animationSpeed"));
}

#[test]
fn test_missing_flows_file_fails() {
    let dir = tempdir().unwrap();
    tradeflow()
        .arg("--headless")
        .arg("--flows")
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure();
}
