//! Integration tests for the `sdnctl` CLI binary.
//!
//! These drive the binary against the sample emulated fabric, so no
//! switch or controller is needed.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `sdnctl` binary with env isolation.
///
/// Clears all `SDNCTL_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn sdnctl_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sdnctl");
    cmd.env("HOME", "/tmp/sdnctl-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/sdnctl-cli-test-nonexistent")
        .env_remove("SDNCTL_CONFIG")
        .env_remove("SDNCTL_FABRIC")
        .env_remove("SDNCTL_OUTPUT")
        .env_remove("SDNCTL_REFRESH_INTERVAL_SECS")
        .env_remove("SDNCTL_QUERY_TIMEOUT_SECS")
        .env_remove("SDNCTL_COMMAND_TIMEOUT_SECS")
        .env_remove("RUST_LOG");
    cmd
}

fn demo_fabric() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/fabric.toml")
}

/// `sdnctl --fabric <demo> ...`
fn with_demo(args: &[&str]) -> assert_cmd::Command {
    let mut cmd = sdnctl_cmd();
    cmd.arg("--fabric").arg(demo_fabric()).args(args);
    cmd
}

fn json_stdout(cmd: &mut assert_cmd::Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = sdnctl_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    sdnctl_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("snapshot")
            .and(predicate::str::contains("flows"))
            .and(predicate::str::contains("meters"))
            .and(predicate::str::contains("apply")),
    );
}

#[test]
fn test_version_flag() {
    sdnctl_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sdnctl"));
}

#[test]
fn test_completions_bash() {
    sdnctl_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    sdnctl_cmd()
        .args(["--config", "/etc/sdnctl/lab.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/etc/sdnctl/lab.toml"));
}

#[test]
fn test_config_show_merges_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "refresh_interval_secs = 10\n").unwrap();

    sdnctl_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("refresh_interval_secs = 10")
                .and(predicate::str::contains("query_timeout_secs = 5")),
        );
}

#[test]
fn test_config_show_env_override_as_json() {
    let config = json_stdout(
        sdnctl_cmd()
            .env("SDNCTL_COMMAND_TIMEOUT_SECS", "9")
            .args(["-o", "json", "config", "show"]),
    );
    assert_eq!(config["command_timeout_secs"], 9);
    assert_eq!(config["log_format"], "text");
}

#[test]
fn test_missing_fabric_is_a_usage_error() {
    sdnctl_cmd()
        .arg("switches")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No fabric"));
}

#[test]
fn test_fabric_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, format!("fabric = {:?}\n", demo_fabric().display().to_string())).unwrap();

    sdnctl_cmd()
        .arg("--config")
        .arg(&path)
        .args(["-o", "plain", "switches"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1").and(predicate::str::contains("2")));
}

// ── Reads ───────────────────────────────────────────────────────────

#[test]
fn test_switches_are_synced() {
    let switches = json_stdout(&mut with_demo(&["-o", "json", "switches"]));
    let switches = switches.as_array().unwrap();
    assert_eq!(switches.len(), 2);
    for sw in switches {
        assert_eq!(sw["state"], "synced");
        assert_eq!(sw["desc"]["hw_desc"], "Open vSwitch");
    }
}

#[test]
fn test_flows_table() {
    with_demo(&["flows", "0x1"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("in_port=1")
                .and(predicate::str::contains("METER:1,OUTPUT:2")),
        );
}

#[test]
fn test_flows_json_carries_stats() {
    let flows = json_stdout(&mut with_demo(&["-o", "json", "flows", "1"]));
    let flows = flows.as_array().unwrap();
    assert_eq!(flows.len(), 2);
    assert_eq!(flows[0]["packet_count"], 0);
}

#[test]
fn test_meters_plain() {
    with_demo(&["-o", "plain", "meters", "1"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));
}

#[test]
fn test_unknown_switch_exits_not_found() {
    with_demo(&["flows", "99"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("switch '99' not found"));
}

#[test]
fn test_links_and_hosts() {
    let links = json_stdout(&mut with_demo(&["-o", "json", "links"]));
    assert_eq!(links.as_array().unwrap().len(), 2);

    with_demo(&["hosts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("00:00:00:00:00:02"));
}

#[test]
fn test_snapshot_json() {
    let snapshot = json_stdout(&mut with_demo(&["-o", "json", "snapshot"]));
    assert_eq!(snapshot["switches"].as_array().unwrap().len(), 2);
    assert_eq!(snapshot["links"].as_array().unwrap().len(), 2);
    assert_eq!(snapshot["hosts"].as_array().unwrap().len(), 2);
}

// ── Apply ───────────────────────────────────────────────────────────

#[test]
fn test_apply_from_stdin() {
    let envelope = r#"{"command": "flow", "method": "add", "data": {
        "dpid": 1, "priority": 20, "match": {"in_port": 3}, "actions": [{"type": "OUTPUT", "port": 1}]
    }}"#;
    let report = json_stdout(
        with_demo(&["-o", "json", "apply", "-", "--snapshot"]).write_stdin(envelope),
    );
    assert_eq!(report["results"][0]["result"], "applied");
    let s1 = &report["snapshot"]["switches"][0];
    assert_eq!(s1["flow_tables"].as_array().unwrap().len(), 3);
}

#[test]
fn test_apply_invalid_match_is_usage_error() {
    let envelope = r#"{"command": "flow", "method": "add", "data": {
        "dpid": 1, "match": {"in_prot": 3}, "actions": [{"type": "OUTPUT", "port": 1}]
    }}"#;
    with_demo(&["apply", "-"])
        .write_stdin(envelope)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("in_prot"));
}

#[test]
fn test_apply_batch_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("batch.json");
    std::fs::write(
        &path,
        r#"[
            {"command": "meter", "method": "add", "data": {
                "dpid": 2, "meter_id": 5, "flags": "KBPS",
                "bands": [{"type": "DROP", "rate": 1000, "burst_size": 0}]}},
            {"command": "flow", "method": "delete", "data": {
                "dpid": 2, "table_id": 0, "priority": 99, "match": {"in_port": 7}}}
        ]"#,
    )
    .unwrap();

    with_demo(&["-o", "plain", "apply"])
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("applied").and(predicate::str::contains("failed")))
        .stderr(predicate::str::contains("1 of 2 commands failed"));
}
