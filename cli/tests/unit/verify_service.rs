//! Verifier service against a scripted probe.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use outpost_cli::application::services::verify::{VerifyOptions, run_battery, send_request};
use outpost_cli::domain::exit;
use outpost_cli::domain::probe::{
    FailureReason, HttpMethod, HttpReply, HttpRequest, RequestBody, Section, TransportError,
    default_battery,
};

use crate::helpers::{CollectingReporter, ScriptedProbe, reply};

fn opts(requests: usize) -> VerifyOptions {
    VerifyOptions {
        timeout: Duration::from_secs(1),
        requests,
    }
}

/// A service that honours the whole default contract.
fn healthy(request: &HttpRequest) -> Result<HttpReply, TransportError> {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => reply(200, "<html>ok</html>"),
        ("GET", "/status") => reply(200, r#"{"status":"ok"}"#),
        ("GET", "/messages") => reply(200, "[]"),
        ("POST", "/messages") => match &request.body {
            Some(RequestBody::Raw { .. }) => reply(400, "bad json"),
            _ => reply(201, r#"{"id":1}"#),
        },
        ("PUT" | "DELETE", "/messages/1") => reply(200, "{}"),
        _ => reply(404, "not found"),
    }
}

#[tokio::test]
async fn unreachable_service_short_circuits() {
    let probe = ScriptedProbe::new(|_| Err(TransportError::Refused("connection refused".into())));
    let reporter = CollectingReporter::default();

    let report = run_battery(&probe, &default_battery(), &opts(10), &reporter).await;

    assert!(!report.reachable);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].section, Section::Connectivity);
    assert!(matches!(
        report.results[0].reason(),
        Some(FailureReason::ConnectionRefused { .. })
    ));
    assert_eq!(probe.seen(), ["GET /"]);
    assert_eq!(exit::for_report(&report), exit::VERIFY_UNREACHABLE);
    assert!(
        reporter.events().iter().any(|e| e.starts_with("warn: service unreachable")),
        "{:?}",
        reporter.events()
    );
}

#[tokio::test]
async fn healthy_service_passes_every_hard_check() {
    let probe = ScriptedProbe::new(healthy);

    let report = run_battery(&probe, &default_battery(), &opts(10), &CollectingReporter::default()).await;

    assert!(report.reachable);
    assert!(report.passed(), "failures: {:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.section(Section::Contract).len(), 5);
    assert_eq!(report.section(Section::ErrorPath).len(), 2);
    let load = report.load.as_ref().expect("load stats");
    assert_eq!(load.requests, 10);
    assert_eq!(load.succeeded, 10);
    assert_eq!(exit::for_report(&report), exit::OK);
}

#[tokio::test]
async fn broken_create_is_the_only_failure() {
    let probe = ScriptedProbe::new(|request| {
        if request.method == HttpMethod::Post
            && request.path == "/messages"
            && matches!(request.body, Some(RequestBody::Json(_)))
        {
            return reply(500, "internal error");
        }
        healthy(request)
    });

    let report = run_battery(&probe, &default_battery(), &opts(0), &CollectingReporter::default()).await;

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].check, "create");
    assert_eq!(
        failures[0].reason(),
        Some(&FailureReason::ContractMismatch {
            expected: 201,
            observed: 500
        })
    );
    assert!(report.load.is_none());
    assert_eq!(exit::for_report(&report), exit::VERIFY_FAILED);
}

#[tokio::test]
async fn accepting_malformed_payload_fails_error_path() {
    let probe = ScriptedProbe::new(|request| {
        if matches!(request.body, Some(RequestBody::Raw { .. })) {
            return reply(200, r#"{"id":2}"#);
        }
        healthy(request)
    });

    let report = run_battery(&probe, &default_battery(), &opts(0), &CollectingReporter::default()).await;

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].check, "malformed-payload");
    assert_eq!(failures[0].section, Section::ErrorPath);
    assert_eq!(
        failures[0].reason(),
        Some(&FailureReason::ContractMismatch {
            expected: 400,
            observed: 200
        })
    );
    assert!(!report.passed());
}

#[tokio::test]
async fn rejecting_malformed_payload_passes_error_path() {
    let probe = ScriptedProbe::new(healthy);

    let report = run_battery(&probe, &default_battery(), &opts(0), &CollectingReporter::default()).await;

    let malformed = report
        .results
        .iter()
        .find(|r| r.check == "malformed-payload")
        .expect("malformed-payload result");
    assert!(malformed.passed());
    assert_eq!(malformed.observed, Some(400));
}

#[tokio::test]
async fn non_json_status_body_is_malformed() {
    let probe = ScriptedProbe::new(|request| {
        if request.path == "/status" {
            return reply(200, "ok");
        }
        healthy(request)
    });

    let report = run_battery(&probe, &default_battery(), &opts(0), &CollectingReporter::default()).await;

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0].reason(),
        Some(FailureReason::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn load_failures_warn_without_failing_the_run() {
    let probe = ScriptedProbe::new(|request| {
        if request.path == "/busy" {
            return reply(503, "busy");
        }
        healthy(request)
    });
    let mut battery = default_battery();
    battery.load_path = Some("/busy".to_string());
    let reporter = CollectingReporter::default();

    let report = run_battery(&probe, &battery, &opts(4), &reporter).await;

    assert!(report.passed(), "load failures are advisory");
    let load = report.load.as_ref().expect("load stats");
    assert_eq!(load.succeeded, 0);
    let load_results = report.section(Section::Load);
    assert_eq!(load_results.len(), 1);
    assert_eq!(load_results[0].check, "load x4");
    assert!(!load_results[0].passed());
    assert!(reporter.events().iter().any(|e| e.starts_with("warn: load x4")));
}

#[tokio::test]
async fn slow_reply_times_out() {
    struct Slow;
    impl outpost_cli::application::ports::HttpProbe for Slow {
        fn base_url(&self) -> &str {
            "http://127.0.0.1:8000"
        }
        async fn send(&self, _: &HttpRequest) -> Result<HttpReply, TransportError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            reply(200, "")
        }
    }

    let err = send_request(&Slow, &HttpRequest::get("/"), Duration::from_millis(20))
        .await
        .expect_err("should time out");
    assert_eq!(err, TransportError::Timeout);
}

#[tokio::test]
async fn single_request_reports_any_status() {
    let probe = ScriptedProbe::new(healthy);

    let exchange = send_request(&probe, &HttpRequest::get("/nope"), Duration::from_secs(1))
        .await
        .expect("reply");

    assert_eq!(exchange.status, 404);
    assert_eq!(exchange.url, "http://127.0.0.1:8000/nope");
    assert_eq!(exchange.body, b"not found");
}
