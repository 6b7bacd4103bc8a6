//! Verification domain types and pure evaluation functions.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

// ── Constants ─────────────────────────────────────────────────────────────────

pub const ROOT_PATH: &str = "/";
pub const STATUS_PATH: &str = "/status";
pub const MESSAGES_PATH: &str = "/messages";
pub const MESSAGE_ITEM_PATH: &str = "/messages/1";
pub const MISSING_PATH: &str = "/outpost-missing-resource";
/// Deliberately truncated JSON sent by the malformed-payload check.
pub const MALFORMED_BODY: &str = r#"{"content": "#;
pub const DEFAULT_LOAD_REQUESTS: usize = 10;

// ── Requests and replies ──────────────────────────────────────────────────────

/// HTTP method used by a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            other => Err(format!(
                "unsupported method '{other}' (expected GET, POST, PUT, PATCH, DELETE or HEAD)"
            )),
        }
    }
}

/// Body attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `application/json`.
    Json(serde_json::Value),
    /// Sent verbatim with the given content type.
    Raw { content_type: String, text: String },
}

/// One request against the service, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(path: &str) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.to_string(),
            body: None,
        }
    }
}

/// What came back from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to obtain any reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection refused: {0}")]
    Refused(String),

    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

// ── Checks ────────────────────────────────────────────────────────────────────

/// Battery section a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Connectivity,
    Contract,
    ErrorPath,
    Load,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connectivity => "connectivity",
            Self::Contract => "contract",
            Self::ErrorPath => "error path",
            Self::Load => "load",
        })
    }
}

/// A declared request with its expected status.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSpec {
    pub name: String,
    pub section: Section,
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<RequestBody>,
    pub expect_status: u16,
    /// Accept any 2xx status instead of exactly `expect_status`.
    pub any_success: bool,
    /// Require a parsable JSON body (extra fields are tolerated).
    pub expect_json: bool,
}

impl CheckSpec {
    #[must_use]
    pub fn new(name: &str, section: Section, method: HttpMethod, path: &str, expect: u16) -> Self {
        Self {
            name: name.to_string(),
            section,
            method,
            path: path.to_string(),
            body: None,
            expect_status: expect,
            any_success: false,
            expect_json: false,
        }
    }

    #[must_use]
    pub fn accepting_any_success(mut self) -> Self {
        self.any_success = true;
        self
    }

    /// Whether `status` satisfies the expectation.
    #[must_use]
    pub fn accepts(&self, status: u16) -> bool {
        if self.any_success {
            (200..300).contains(&status)
        } else {
            status == self.expect_status
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn expecting_json(mut self) -> Self {
        self.expect_json = true;
        self
    }

    #[must_use]
    pub fn request(&self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            path: self.path.clone(),
            body: self.body.clone(),
        }
    }
}

/// Ordered battery: connectivity gate, independent checks, load path.
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    pub connectivity: CheckSpec,
    pub checks: Vec<CheckSpec>,
    /// Path hit concurrently by the load check; `None` disables it.
    pub load_path: Option<String>,
}

/// The default battery against the conventional messaging-style resource.
#[must_use]
pub fn default_battery() -> Battery {
    Battery {
        connectivity: CheckSpec::new("root", Section::Connectivity, HttpMethod::Get, ROOT_PATH, 200)
            .accepting_any_success(),
        checks: default_checks(),
        load_path: Some(STATUS_PATH.to_string()),
    }
}

/// Default contract and error-path checks, in execution order.
#[must_use]
pub fn default_checks() -> Vec<CheckSpec> {
    vec![
        CheckSpec::new("status", Section::Contract, HttpMethod::Get, STATUS_PATH, 200)
            .expecting_json(),
        CheckSpec::new("read", Section::Contract, HttpMethod::Get, MESSAGES_PATH, 200),
        CheckSpec::new("create", Section::Contract, HttpMethod::Post, MESSAGES_PATH, 201)
            .with_body(RequestBody::Json(
                serde_json::json!({ "content": "outpost probe" }),
            )),
        CheckSpec::new("update", Section::Contract, HttpMethod::Put, MESSAGE_ITEM_PATH, 200)
            .with_body(RequestBody::Json(
                serde_json::json!({ "content": "outpost probe (updated)" }),
            )),
        CheckSpec::new("delete", Section::Contract, HttpMethod::Delete, MESSAGE_ITEM_PATH, 200),
        CheckSpec::new("not-found", Section::ErrorPath, HttpMethod::Get, MISSING_PATH, 404),
        CheckSpec::new("malformed-payload", Section::ErrorPath, HttpMethod::Post, MESSAGES_PATH, 400)
            .with_body(RequestBody::Raw {
                content_type: "application/json".to_string(),
                text: MALFORMED_BODY.to_string(),
            }),
    ]
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Why a check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    ConnectionRefused { detail: String },
    Timeout,
    ContractMismatch { expected: u16, observed: u16 },
    MalformedResponse { detail: String },
    Protocol { detail: String },
}

impl FailureReason {
    /// Whether the service could not be reached at all.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::ConnectionRefused { .. } | Self::Timeout)
    }
}

impl From<TransportError> for FailureReason {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Refused(detail) => Self::ConnectionRefused { detail },
            TransportError::Timeout => Self::Timeout,
            TransportError::Other(detail) => Self::Protocol { detail },
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionRefused { detail } => write!(f, "connection refused ({detail})"),
            Self::Timeout => f.write_str("timeout"),
            Self::ContractMismatch { expected, observed } => {
                write!(f, "expected {expected}, got {observed}")
            }
            Self::MalformedResponse { detail } => write!(f, "malformed response ({detail})"),
            Self::Protocol { detail } => write!(f, "protocol error ({detail})"),
        }
    }
}

/// Pass or fail, with the reason on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeOutcome {
    Pass,
    Fail { reason: FailureReason },
}

impl ProbeOutcome {
    #[must_use]
    pub fn fail(reason: FailureReason) -> Self {
        Self::Fail { reason }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's serialize_with signature
fn as_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64() * 1000.0)
}

/// Outcome of one verification check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub check: String,
    pub section: Section,
    pub method: HttpMethod,
    pub path: String,
    pub expected: u16,
    pub observed: Option<u16>,
    #[serde(rename = "latency_ms", serialize_with = "as_millis")]
    pub latency: Duration,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == ProbeOutcome::Pass
    }

    #[must_use]
    pub fn reason(&self) -> Option<&FailureReason> {
        match &self.outcome {
            ProbeOutcome::Pass => None,
            ProbeOutcome::Fail { reason } => Some(reason),
        }
    }
}

/// Aggregate numbers from the concurrent load check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub path: String,
    pub requests: usize,
    pub succeeded: usize,
    #[serde(rename = "wall_ms", serialize_with = "as_millis")]
    pub wall: Duration,
    #[serde(rename = "average_ms", serialize_with = "as_millis")]
    pub average: Duration,
    #[serde(rename = "max_ms", serialize_with = "as_millis")]
    pub max: Duration,
}

/// Ordered results of one verifier run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub reachable: bool,
    pub results: Vec<ProbeResult>,
    pub load: Option<LoadStats>,
}

impl Report {
    #[must_use]
    pub fn new(target: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            target: target.to_string(),
            started_at,
            reachable: false,
            results: Vec::new(),
            load: None,
        }
    }

    /// True when reachable and every hard (non-load) check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.reachable
            && self
                .results
                .iter()
                .filter(|r| r.section != Section::Load)
                .all(ProbeResult::passed)
    }

    /// Results of hard checks that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results
            .iter()
            .filter(|r| r.section != Section::Load && !r.passed())
    }

    #[must_use]
    pub fn section(&self, section: Section) -> Vec<&ProbeResult> {
        self.results.iter().filter(|r| r.section == section).collect()
    }
}

// ── Pure functions ────────────────────────────────────────────────────────────

/// Judge a reply against its check.
///
/// Status is compared first; a JSON body is only required once the status
/// matched, and unknown fields are accepted.
#[must_use]
pub fn evaluate(spec: &CheckSpec, reply: &HttpReply) -> ProbeOutcome {
    if !spec.accepts(reply.status) {
        return ProbeOutcome::fail(FailureReason::ContractMismatch {
            expected: spec.expect_status,
            observed: reply.status,
        });
    }
    if spec.expect_json {
        if let Err(e) = serde_json::from_slice::<serde_json::Value>(&reply.body) {
            return ProbeOutcome::fail(FailureReason::MalformedResponse {
                detail: e.to_string(),
            });
        }
    }
    ProbeOutcome::Pass
}

/// Average and maximum of a set of latencies.
#[must_use]
pub fn latency_stats(latencies: &[Duration]) -> (Duration, Duration) {
    if latencies.is_empty() {
        return (Duration::ZERO, Duration::ZERO);
    }
    let total: Duration = latencies.iter().sum();
    let count = u32::try_from(latencies.len()).unwrap_or(u32::MAX);
    let max = latencies.iter().max().copied().unwrap_or_default();
    (total / count, max)
}

// ── Unit tests ────────────────────────────────────────────────────────────────
