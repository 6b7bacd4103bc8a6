//! Verifier and reqwest probe against a real HTTP service on an ephemeral port.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use outpost_cli::application::services::verify::{VerifyOptions, run_battery};
use outpost_cli::domain::exit;
use outpost_cli::domain::probe::{FailureReason, default_battery};
use outpost_cli::infra::http::ReqwestProbe;
use outpost_cli::output::SilentReporter;
use serde_json::{Value, json};

/// Delay applied to `/status` so concurrency is observable.
const STATUS_DELAY: Duration = Duration::from_millis(200);

async fn status() -> Json<Value> {
    tokio::time::sleep(STATUS_DELAY).await;
    Json(json!({ "status": "ok" }))
}

async fn create(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "id": 1, "content": body["content"] })))
}

async fn update(Path(id): Path<u64>, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "id": id, "content": body["content"] }))
}

async fn remove(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({ "deleted": id }))
}

/// Serve the conventional messaging contract; returns the bound address.
async fn spawn_service() -> SocketAddr {
    let app = Router::new()
        .route("/", get(|| async { Html("<h1>outpost</h1>") }))
        .route("/status", get(status))
        .route("/messages", get(|| async { Json(json!([])) }).post(create))
        .route("/messages/{id}", axum::routing::put(update).delete(remove));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

/// A port nothing listens on.
async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    listener.local_addr().expect("addr").port()
}

#[tokio::test]
async fn conforming_service_passes_the_default_battery() {
    let addr = spawn_service().await;
    let probe = ReqwestProbe::new("127.0.0.1", addr.port(), Duration::from_secs(5)).expect("probe");
    let opts = VerifyOptions {
        timeout: Duration::from_secs(5),
        requests: 10,
    };

    let report = run_battery(&probe, &default_battery(), &opts, &SilentReporter).await;

    assert!(report.reachable);
    assert!(
        report.passed(),
        "failures: {:?}",
        report.failures().collect::<Vec<_>>()
    );
    assert_eq!(exit::for_report(&report), exit::OK);
}

#[tokio::test]
async fn load_requests_run_concurrently() {
    let addr = spawn_service().await;
    let probe = ReqwestProbe::new("127.0.0.1", addr.port(), Duration::from_secs(5)).expect("probe");
    let opts = VerifyOptions {
        timeout: Duration::from_secs(5),
        requests: 10,
    };

    let report = run_battery(&probe, &default_battery(), &opts, &SilentReporter).await;

    let load = report.load.as_ref().expect("load stats");
    assert_eq!(load.succeeded, 10);
    assert!(load.max >= STATUS_DELAY);
    assert!(
        load.wall < Duration::from_secs(1),
        "10 x 200 ms sequentially would take 2 s, took {:?}",
        load.wall
    );
}

#[tokio::test]
async fn closed_port_is_reported_unreachable() {
    let port = closed_port().await;
    let probe = ReqwestProbe::new("127.0.0.1", port, Duration::from_secs(2)).expect("probe");

    let report = run_battery(
        &probe,
        &default_battery(),
        &VerifyOptions::default(),
        &SilentReporter,
    )
    .await;

    assert!(!report.reachable);
    assert_eq!(report.results.len(), 1);
    assert!(matches!(
        report.results[0].reason(),
        Some(FailureReason::ConnectionRefused { .. })
    ));
    assert_eq!(exit::for_report(&report), exit::VERIFY_UNREACHABLE);
}
