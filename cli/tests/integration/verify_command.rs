//! Integration tests for `outpost verify` against a port nobody listens on.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::support::{closed_port, outpost, temp_dir};

#[test]
fn test_verify_unreachable_service_exits_60() {
    let dir = temp_dir();
    let port = closed_port();
    outpost(&dir)
        .args(["verify", "--requests", "0", "--timeout", "2", "--port"])
        .arg(port.to_string())
        .assert()
        .code(60)
        .stderr(predicate::str::contains("service unreachable"));
}

#[test]
fn test_verify_json_reports_unreachable() {
    let dir = temp_dir();
    let port = closed_port();
    let output = outpost(&dir)
        .args(["verify", "--json", "--timeout", "2", "--port"])
        .arg(port.to_string())
        .assert()
        .code(60)
        .get_output()
        .stdout
        .clone();
    let doc: serde_json::Value = serde_json::from_slice(&output).expect("single JSON document");
    assert_eq!(doc["passed"], false);
    assert_eq!(doc["report"]["reachable"], false);
    assert_eq!(doc["report"]["results"].as_array().unwrap().len(), 1);
    assert_eq!(
        doc["report"]["results"][0]["outcome"]["reason"]["kind"],
        "connection_refused"
    );
}

#[test]
fn test_verify_rejects_invalid_configured_checks() {
    let dir = temp_dir();
    crate::support::write_config(
        &dir,
        "verify:\n  checks:\n    - name: bad\n      path: no-slash\n",
    );
    outpost(&dir)
        .arg("verify")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"));
}
