//! End-to-end tests driving the `timesheet` binary.
//!
//! Each test runs with `HOME` pointed at a temp directory so no user
//! configuration leaks in.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn timesheet_binary() -> String {
    env!("CARGO_BIN_EXE_timesheet").to_string()
}

fn timesheet(home: &Path) -> Command {
    let mut cmd = Command::new(timesheet_binary());
    cmd.env("HOME", home)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("TIMESHEET_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

fn write_input(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("activity.json");
    std::fs::write(&path, json).unwrap();
    path
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "timesheet should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

const ACTIVITY: &str = r#"{
    "tickets": [
        {"activity_id": "PRJ-1", "from": "2020-03-02T09:00:00Z", "to": "2020-03-02T17:00:00Z"},
        {"activity_id": "PRJ-9", "from": "2020-03-02T14:15:00Z", "to": "2020-03-04T10:45:00Z"}
    ],
    "meetings": [
        {"title": "Planning", "from": "2020-03-03T13:00:00Z", "to": "2020-03-03T14:00:00Z"}
    ]
}"#;

/// Full run: JSON output for a fixed "now", most recent day first.
#[test]
fn test_compute_json() {
    let temp = TempDir::new().unwrap();
    let input = write_input(temp.path(), ACTIVITY);

    let output = timesheet(temp.path())
        .args(["compute", "--days", "3", "--now", "2020-03-04T11:00:00Z", "--json"])
        .arg("--input")
        .arg(&input)
        .output()
        .unwrap();
    let value = stdout_json(&output);

    assert_eq!(value["generated_at"], "2020-03-04T11:00:00+00:00");
    let days = value["days"].as_array().unwrap();
    let dates: Vec<_> = days.iter().map(|d| d["date"].as_str().unwrap()).collect();
    assert_eq!(
        dates,
        vec![
            "2020-03-04T08:30:00Z",
            "2020-03-03T08:30:00Z",
            "2020-03-02T08:30:00Z"
        ]
    );

    // Monday: PRJ-1 (7h after lunch) plus the first PRJ-9 segment, capped at 8
    let monday = &days[2];
    assert_eq!(monday["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(monday["include"], 8.0);
    assert_eq!(monday["exclude"], 2.0);
    assert_eq!(monday["total"], 6.0);
}

/// The exclude policy can be switched off through the environment.
#[test]
fn test_compute_env_overrides_exclude_policy() {
    let temp = TempDir::new().unwrap();
    let input = write_input(temp.path(), ACTIVITY);

    let output = timesheet(temp.path())
        .env("TIMESHEET_EXCLUDE_POLICY", "none")
        .args(["compute", "--days", "3", "--now", "2020-03-04T11:00:00Z", "--json"])
        .arg("--input")
        .arg(&input)
        .output()
        .unwrap();
    let value = stdout_json(&output);

    for day in value["days"].as_array().unwrap() {
        assert_eq!(day["exclude"], 0.0);
        assert_eq!(day["total"], day["include"]);
    }
}

/// Nested hours come from a config file passed with --config.
#[test]
fn test_compute_reads_config_file() {
    let temp = TempDir::new().unwrap();
    let input = write_input(temp.path(), ACTIVITY);
    let config = temp.path().join("timesheet.toml");
    std::fs::write(&config, "[hours]\nworking = 6.0\ninterrupts = 0.0\n").unwrap();

    let output = timesheet(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["compute", "--days", "1", "--now", "2020-03-04T11:00:00Z", "--json"])
        .arg("--input")
        .arg(&input)
        .output()
        .unwrap();
    let value = stdout_json(&output);

    let days = value["days"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["include"], 6.0);
    assert_eq!(days[0]["exclude"], 0.0);
}

/// Human-readable output lists each day and its tasks.
#[test]
fn test_compute_human_readable() {
    let temp = TempDir::new().unwrap();
    let input = write_input(temp.path(), ACTIVITY);

    let output = timesheet(temp.path())
        .args(["compute", "--days", "3", "--now", "2020-03-04T11:00:00Z"])
        .arg("--input")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("TIMESHEET: 3 days, 18.00h total"), "{stdout}");
    assert!(stdout.contains("Mon 2020-03-02"));
    assert!(stdout.contains("  PRJ-1         7.00h  09:00-17:00"));
}

/// Malformed periods fail the run with a clear message.
#[test]
fn test_compute_rejects_reversed_period() {
    let temp = TempDir::new().unwrap();
    let input = write_input(
        temp.path(),
        r#"{"tickets": [{"activity_id": "PRJ-1", "from": "2020-03-04T10:00:00Z", "to": "2020-03-04T09:00:00Z"}]}"#,
    );

    let output = timesheet(temp.path())
        .args(["compute", "--now", "2020-03-04T11:00:00Z"])
        .arg("--input")
        .arg(&input)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid period"), "{stderr}");
}

/// A lookback past the representable calendar is an error, not a crash.
#[test]
fn test_compute_rejects_unrepresentable_lookback() {
    let temp = TempDir::new().unwrap();
    let input = write_input(temp.path(), ACTIVITY);

    let output = timesheet(temp.path())
        .args(["compute", "--days", "4294967295", "--now", "2020-03-04T11:00:00Z"])
        .arg("--input")
        .arg(&input)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("out of range"), "{stderr}");
    assert!(!stderr.contains("panicked"), "{stderr}");
}

/// Unusable hours from the environment are rejected at startup.
#[test]
fn test_invalid_hours_rejected() {
    let temp = TempDir::new().unwrap();
    let input = write_input(temp.path(), ACTIVITY);

    for (key, value) in [
        ("TIMESHEET_HOURS__WORKING", "-8.0"),
        ("TIMESHEET_HOURS__WORKING", "100"),
        ("TIMESHEET_HOURS__LUNCH", "12.0"),
    ] {
        let output = timesheet(temp.path())
            .env(key, value)
            .args(["compute", "--now", "2020-03-04T11:00:00Z"])
            .arg("--input")
            .arg(&input)
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(1), "{key}={value}");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("invalid hours"), "{key}={value}: {stderr}");
    }
}

/// The config subcommand prints the effective configuration.
#[test]
fn test_config_shows_defaults() {
    let temp = TempDir::new().unwrap();

    let output = timesheet(temp.path()).arg("config").output().unwrap();
    let value = stdout_json(&output);

    assert_eq!(value["compute_days"], 10);
    assert_eq!(value["hours"]["working"], 8.0);
    assert_eq!(value["exclude_policy"], "interrupt_budget");
}
