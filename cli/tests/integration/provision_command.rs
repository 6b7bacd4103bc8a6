//! Integration tests for `outpost provision --dry-run`, which needs neither
//! root nor a supervisor.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::support::{outpost, temp_dir, write_config};

#[test]
fn test_dry_run_lists_actions_and_artifacts() {
    let dir = temp_dir();
    outpost(&dir)
        .args(["provision", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would install packages: git python3"))
        .stdout(predicate::str::contains("would register service outpost-app"))
        .stdout(predicate::str::contains("/etc/systemd/system/outpost-app.service"))
        .stdout(predicate::str::contains("User=outpost"))
        .stdout(predicate::str::contains("OUTPOST_PORT=8000"))
        .stdout(predicate::str::contains("nothing was changed"));
}

#[test]
fn test_dry_run_applies_flag_overrides() {
    let dir = temp_dir();
    outpost(&dir)
        .args(["provision", "--dry-run", "--account", "notes", "--install-dir", "/srv/notes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("User=notes"))
        .stdout(predicate::str::contains("/srv/notes/outpost.env"));
}

#[test]
fn test_dry_run_json_is_a_single_document() {
    let dir = temp_dir();
    write_config(&dir, "service:\n  repository: https://example.invalid/app.git\n");
    let output = outpost(&dir)
        .args(["provision", "--dry-run", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let doc: serde_json::Value = serde_json::from_slice(&output).expect("single JSON document");
    assert_eq!(doc["dry_run"], true);
    assert_eq!(doc["changed"], 0);
    let steps: Vec<&str> = doc["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        steps,
        ["packages", "account", "install-dir", "source", "environment", "service"]
    );
}

#[test]
fn test_invalid_account_is_rejected_before_anything_runs() {
    let dir = temp_dir();
    outpost(&dir)
        .args(["provision", "--dry-run", "--account", "Bad Name"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("service.account"));
}

#[test]
fn test_relative_install_dir_is_rejected() {
    let dir = temp_dir();
    outpost(&dir)
        .args(["provision", "--dry-run", "--install-dir", "relative/dir"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("install_dir"));
}
