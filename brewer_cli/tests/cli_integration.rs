use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

// Fast sim config: millisecond ticks, no settle pause.
fn write_config(dir: &Path) -> PathBuf {
    let toml = format!(
        r#"
[serial]
port = "/dev/null"
read_timeout_ms = 500

[storage]
dir = "{}"

[controller]
tick_ms = 2
settle_ms = 0
read_failure_limit = 3
read_failure_backoff_ms = 0
"#,
        dir.join("orders").display()
    );
    let path = dir.join("brewer.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_order(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("order.json");
    fs::write(&path, body).unwrap();
    path
}

const TWO_STEP: &str =
    r#"{"name":"IPA","steps":[{"temperature":25,"duration":2},{"temperature":27,"duration":1}]}"#;

fn brewer() -> Command {
    Command::cargo_bin("brewer").unwrap()
}

#[test]
fn help_lists_commands() {
    brewer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("brew"));
}

#[test]
fn brew_runs_order_to_completion_and_logs() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());
    let order = write_order(dir.path(), TWO_STEP);
    brewer()
        .args(["--config", cfg.to_str().unwrap(), "--sim", "brew", "--order"])
        .arg(&order)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("order IPA complete"));

    let logs: Vec<_> = fs::read_dir(dir.path().join("orders"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(logs.len(), 1, "{logs:?}");
    assert!(logs[0].starts_with("IPA_") && logs[0].ends_with(".json"));
    let text = fs::read_to_string(dir.path().join("orders").join(&logs[0])).unwrap();
    assert!(text.lines().count() > 0);
    for line in text.lines() {
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_ne!(v["status"], "idle");
    }
}

#[test]
fn brew_json_prints_status_lines_and_summary() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());
    let order = write_order(
        dir.path(),
        r#"{"BrauOrder":{"name":"Legacy","MaischePlan":[{"temp":21,"duration":"1"}]}}"#,
    );
    let out = brewer()
        .args(["--config", cfg.to_str().unwrap(), "--sim", "--json", "brew", "--order"])
        .arg(&order)
        .timeout(std::time::Duration::from_secs(30))
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let summary = lines.last().unwrap();
    assert_eq!(summary["order"], "Legacy");
    assert_eq!(summary["complete"], true);
    assert!(lines[..lines.len() - 1]
        .iter()
        .all(|v| v.get("timestamp").is_some()));
}

#[rstest]
#[case(r#"{"name":"IPA","steps":[]}"#)]
#[case(r#"{"name":"IPA"}"#)]
#[case("not json")]
fn invalid_order_exits_3(#[case] body: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());
    let order = write_order(dir.path(), body);
    brewer()
        .args(["--config", cfg.to_str().unwrap(), "--sim", "brew", "--order"])
        .arg(&order)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("order"));
}

#[test]
fn invalid_config_exits_2() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[serial]\nport = \"/dev/null\"\nbaud = 0\n").unwrap();
    brewer()
        .args(["--config", cfg.to_str().unwrap(), "--sim", "self-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("serial.baud"));
}

#[test]
fn missing_config_exits_2_with_json_error() {
    let dir = tempdir().unwrap();
    let out = brewer()
        .args(["--config"])
        .arg(dir.path().join("nope.toml"))
        .args(["--json", "--sim", "self-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value = serde_json::from_slice(out.stderr.trim_ascii()).unwrap();
    assert_eq!(v["reason"], "Config");
}

#[test]
fn self_check_reads_one_status() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path());
    brewer()
        .args(["--config", cfg.to_str().unwrap(), "--sim", "self-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: device reports idle"));
}
