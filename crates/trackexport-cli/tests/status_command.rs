//! E2E tests for the status command
//!
//! These tests verify the status command output in various formats.

use std::path::PathBuf;
use std::process::Command;

use pretty_assertions::assert_eq;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Run status command and return (exit_code, stdout, stderr)
fn run_status(dump: &str, args: &[&str]) -> (i32, String, String) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_trackexport"));
    cmd.arg("status")
        .arg("--dump")
        .arg(fixture(dump))
        .env_remove("TRACKEXPORT_CONFIG")
        .env_remove("RUST_LOG");

    for arg in args {
        cmd.arg(arg);
    }

    let output = cmd.output().expect("failed to execute trackexport");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}

// =============================================================================
// Text Output Tests
// =============================================================================

#[test]
fn status_text_shows_observed_span() {
    let (code, stdout, stderr) = run_status("scenario_a.json", &[]);
    assert_eq!(code, 0, "stderr: {stderr}");

    let expected = "\
CRM Migration

Date        Blocked  Completed  Deleted  In Progress  Not Done
----------  -------  ---------  -------  -----------  --------
2026-01-01        0          0        0            1         0
2026-01-02        1          0        0            1         0
2026-01-03        1          1        0            0         0
";
    assert_eq!(stdout, expected);
}

#[test]
fn status_text_follows_config_columns() {
    let config = fixture("columns.toml");
    let (code, stdout, _) = run_status("scenario_a.json", &["--config", config.to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Not Done  In Progress  Completed"), "stdout: {stdout}");
    assert!(!stdout.contains("Blocked"));
}

#[test]
fn status_config_from_environment() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_trackexport"));
    let output = cmd
        .arg("status")
        .arg("--dump")
        .arg(fixture("unavailable.json"))
        .env("TRACKEXPORT_CONFIG", fixture("fast_retry.toml"))
        .output()
        .expect("failed to execute trackexport");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("3 attempts"), "stderr: {stderr}");
}

// =============================================================================
// JSON Output Tests
// =============================================================================

#[test]
fn status_json_is_padded_to_range() {
    let (code, stdout, stderr) = run_status(
        "scenario_a.json",
        &["--format", "json", "--from", "2025-12-31", "--to", "2026-01-05"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["title"], "CRM Migration");

    let snapshots = json["snapshots"].as_array().unwrap();
    let days: Vec<&str> = snapshots.iter().map(|s| s["day"].as_str().unwrap()).collect();
    assert_eq!(
        days,
        vec!["2025-12-31", "2026-01-01", "2026-01-02", "2026-01-03", "2026-01-04", "2026-01-05"]
    );

    // before the first event: all zero
    let first = &snapshots[0]["counts"];
    for category in ["blocked", "completed", "deleted", "in_progress", "not_done"] {
        assert_eq!(first[category], 0, "{category}");
    }

    // after the last event: day 3 carried forward
    for snapshot in &snapshots[3..] {
        assert_eq!(snapshot["counts"], snapshots[3]["counts"]);
        assert_eq!(snapshot["counts"]["completed"], 1);
        assert_eq!(snapshot["counts"]["blocked"], 1);
    }
}

#[test]
fn status_json_without_events_is_empty() {
    let dir = tempfile::TempDir::new().unwrap();
    let dump = dir.path().join("quiet.json");
    std::fs::write(
        &dump,
        r#"{ "project": "Quiet", "items": [{ "id": "T1", "history_key": "h1" }] }"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_trackexport"))
        .args(["status", "--format", "json", "--dump"])
        .arg(&dump)
        .env_remove("TRACKEXPORT_CONFIG")
        .output()
        .expect("failed to execute trackexport");

    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["snapshots"].as_array().unwrap().len(), 0);
}

#[test]
fn status_rejects_repeated_item_id() {
    let dir = tempfile::TempDir::new().unwrap();
    let dump = dir.path().join("repeated.json");
    std::fs::write(
        &dump,
        r#"{ "project": "Twice", "items": [
            { "id": "1", "history_key": "hA" },
            { "id": "1", "history_key": "hB" }
        ] }"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_trackexport"))
        .args(["status", "--dump"])
        .arg(&dump)
        .env_remove("TRACKEXPORT_CONFIG")
        .output()
        .expect("failed to execute trackexport");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate item id '1'"), "stderr: {stderr}");
}
