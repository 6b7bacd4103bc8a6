//! Application service: verify use-case.
//!
//! Runs the check battery against a service through the `HttpProbe` port.
//! Every failure is recorded in the report; nothing here returns early with
//! an error except an unreachable connectivity check.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::future::join_all;

use crate::application::ports::{HttpProbe, ProgressReporter};
use crate::domain::probe::{
    Battery, CheckSpec, FailureReason, HttpMethod, HttpReply, HttpRequest, LoadStats, ProbeOutcome,
    ProbeResult, Report, RequestBody, Section, TransportError, evaluate, latency_stats,
};

/// Per-run verifier settings.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Bound on every single request.
    pub timeout: Duration,
    /// Concurrent requests in the load check.
    pub requests: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            requests: crate::domain::probe::DEFAULT_LOAD_REQUESTS,
        }
    }
}

/// Run the whole battery and build the report.
///
/// A refused or timed-out connectivity check ends the run with
/// `reachable = false` and no further results.
pub async fn run_battery(
    probe: &impl HttpProbe,
    battery: &Battery,
    opts: &VerifyOptions,
    reporter: &impl ProgressReporter,
) -> Report {
    let mut report = Report::new(probe.base_url(), Utc::now());
    tracing::info!(url = probe.base_url(), checks = battery.checks.len(), "verifying");

    let connectivity = run_check(probe, &battery.connectivity, opts.timeout).await;
    emit(reporter, &connectivity);
    let unreachable = connectivity
        .reason()
        .is_some_and(FailureReason::is_unreachable);
    report.results.push(connectivity);
    if unreachable {
        reporter.warn("service unreachable, skipping remaining checks");
        return report;
    }
    report.reachable = true;

    for spec in &battery.checks {
        let result = run_check(probe, spec, opts.timeout).await;
        emit(reporter, &result);
        report.results.push(result);
    }

    if let Some(path) = battery.load_path.as_deref() {
        if opts.requests > 0 {
            let (stats, result) = run_load(probe, path, opts).await;
            emit(reporter, &result);
            report.results.push(result);
            report.load = Some(stats);
        }
    }

    report
}

/// Send one request bounded by `timeout`, returning the reply and latency.
async fn timed_send(
    probe: &impl HttpProbe,
    request: &HttpRequest,
    timeout: Duration,
) -> (Result<HttpReply, TransportError>, Duration) {
    let start = Instant::now();
    let reply = match tokio::time::timeout(timeout, probe.send(request)).await {
        Ok(reply) => reply,
        Err(_) => Err(TransportError::Timeout),
    };
    (reply, start.elapsed())
}

/// Execute a single check.
pub async fn run_check(probe: &impl HttpProbe, spec: &CheckSpec, timeout: Duration) -> ProbeResult {
    let (reply, latency) = timed_send(probe, &spec.request(), timeout).await;
    let (observed, outcome) = match reply {
        Ok(reply) => (Some(reply.status), evaluate(spec, &reply)),
        Err(err) => (None, ProbeOutcome::fail(err.into())),
    };
    tracing::debug!(
        check = %spec.name,
        method = %spec.method,
        path = %spec.path,
        ?observed,
        latency_ms = latency.as_millis(),
        "probe finished"
    );
    ProbeResult {
        check: spec.name.clone(),
        section: spec.section,
        method: spec.method,
        path: spec.path.clone(),
        expected: spec.expect_status,
        observed,
        latency,
        outcome,
    }
}

/// Fire `opts.requests` concurrent GETs and aggregate once all complete.
async fn run_load(
    probe: &impl HttpProbe,
    path: &str,
    opts: &VerifyOptions,
) -> (LoadStats, ProbeResult) {
    let request = HttpRequest::get(path);
    let wall_start = Instant::now();
    let replies = join_all((0..opts.requests).map(|_| timed_send(probe, &request, opts.timeout))).await;
    let wall = wall_start.elapsed();

    let latencies: Vec<Duration> = replies.iter().map(|(_, latency)| *latency).collect();
    let (average, max) = latency_stats(&latencies);
    let succeeded = replies
        .iter()
        .filter(|(reply, _)| reply.as_ref().is_ok_and(HttpReply::is_success))
        .count();
    let first_failure = replies.iter().find_map(|(reply, _)| match reply {
        Ok(r) if r.is_success() => None,
        Ok(r) => Some(FailureReason::ContractMismatch {
            expected: 200,
            observed: r.status,
        }),
        Err(e) => Some(e.clone().into()),
    });

    tracing::info!(path, requests = opts.requests, succeeded, wall_ms = wall.as_millis(), "load finished");

    let stats = LoadStats {
        path: path.to_string(),
        requests: opts.requests,
        succeeded,
        wall,
        average,
        max,
    };
    let result = ProbeResult {
        check: format!("load x{}", opts.requests),
        section: Section::Load,
        method: HttpMethod::Get,
        path: path.to_string(),
        expected: 200,
        observed: None,
        latency: wall,
        outcome: first_failure.map_or(ProbeOutcome::Pass, ProbeOutcome::fail),
    };
    (stats, result)
}

fn emit(reporter: &impl ProgressReporter, result: &ProbeResult) {
    let line = format!(
        "{} {}: {} {} ({:.1} ms)",
        result.section,
        result.check,
        result.method,
        result.path,
        result.latency.as_secs_f64() * 1000.0
    );
    match result.reason() {
        None => reporter.success(&line),
        Some(reason) if result.section == Section::Load => {
            reporter.warn(&format!("{line}: {reason}"));
        }
        Some(reason) => reporter.fail(&format!("{line}: {reason}")),
    }
}

// ── Single request mode ───────────────────────────────────────────────────────

/// One request and what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub method: HttpMethod,
    pub url: String,
    pub status: u16,
    pub latency: Duration,
    pub body: Vec<u8>,
}

/// Parse `--data` locally so bad JSON never reaches the service.
///
/// # Errors
///
/// Returns an error if `data` is not valid JSON.
pub fn json_body(data: &str) -> Result<RequestBody> {
    let value: serde_json::Value =
        serde_json::from_str(data).context("--data is not valid JSON")?;
    Ok(RequestBody::Json(value))
}

/// Send one request and report status, latency and body.
///
/// # Errors
///
/// Returns the transport error when no reply arrived in time.
pub async fn send_request(
    probe: &impl HttpProbe,
    request: &HttpRequest,
    timeout: Duration,
) -> Result<Exchange, TransportError> {
    let (reply, latency) = timed_send(probe, request, timeout).await;
    let reply = reply?;
    Ok(Exchange {
        method: request.method,
        url: format!("{}{}", probe.base_url(), request.path),
        status: reply.status,
        latency,
        body: reply.body,
    })
}
