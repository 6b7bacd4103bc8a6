//! Domain types and validators for outpost configuration.
//!
//! Pure functions only, no I/O.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use outpost_common::conventions::{
    DEFAULT_HOST, DEFAULT_LOG_LEVEL, DEFAULT_PORT, ENV_HOST, ENV_LOG_LEVEL, ENV_PORT,
    FEATURE_PREFIX, feature_key,
};
use outpost_common::env_file::validate_key;
use outpost_common::{RestartPolicy, ServiceDefinition};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::probe::{
    Battery, CheckSpec, DEFAULT_LOAD_REQUESTS, HttpMethod, RequestBody, Section, default_battery,
};

/// Account and service names: what `useradd` and systemd both accept.
pub static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("valid regex")
});

/// Subdirectory of the install dir that holds the git checkout.
pub const CHECKOUT_DIR: &str = "app";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.outpost/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutpostConfig {
    pub service: ServiceConfig,
    /// OS packages installed before anything else.
    pub packages: Vec<String>,
    /// Commands run as the account once the source is in place.
    pub setup: Vec<SetupCommand>,
    pub verify: VerifyConfig,
}

impl Default for OutpostConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            packages: vec!["git".to_string(), "python3".to_string()],
            setup: Vec::new(),
            verify: VerifyConfig::default(),
        }
    }
}

/// The managed service and the account it runs as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub description: String,
    pub account: String,
    pub install_dir: PathBuf,
    /// Git URL synced into `<install_dir>/app`; `None` runs from the install dir.
    pub repository: Option<String>,
    pub branch: String,
    pub exec: Vec<String>,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub features: BTreeMap<String, bool>,
    pub restart_secs: u64,
    /// How long the supervisor gets to report the service active.
    pub settle_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "outpost-app".to_string(),
            description: "outpost managed service".to_string(),
            account: "outpost".to_string(),
            install_dir: PathBuf::from("/opt/outpost"),
            repository: None,
            branch: "main".to_string(),
            exec: vec!["/usr/bin/python3".to_string(), "app.py".to_string()],
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            features: BTreeMap::new(),
            restart_secs: 10,
            settle_secs: 10,
        }
    }
}

/// A setup command, skipped when `creates` already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupCommand {
    pub command: Vec<String>,
    /// Relative paths resolve against the service working directory.
    #[serde(default)]
    pub creates: Option<PathBuf>,
}

/// Verifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Defaults to the service host.
    pub host: Option<String>,
    /// Defaults to the service port.
    pub port: Option<u16>,
    pub timeout_secs: u64,
    /// Concurrent requests in the load check; 0 disables it.
    pub requests: usize,
    /// Replaces the default contract and error-path checks when set.
    pub checks: Option<Vec<CheckConfig>>,
    pub load_path: Option<String>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            timeout_secs: 5,
            requests: DEFAULT_LOAD_REQUESTS,
            checks: None,
            load_path: None,
        }
    }
}

/// Declarative check as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    pub name: String,
    #[serde(default = "default_section")]
    pub section: Section,
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default = "default_expect_status")]
    pub expect_status: u16,
    #[serde(default)]
    pub expect_json: bool,
}

fn default_section() -> Section {
    Section::Contract
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

fn default_expect_status() -> u16 {
    200
}

impl From<&CheckConfig> for CheckSpec {
    fn from(c: &CheckConfig) -> Self {
        let body = match (&c.body, &c.raw_body) {
            (Some(json), _) => Some(RequestBody::Json(json.clone())),
            (None, Some(text)) => Some(RequestBody::Raw {
                content_type: c
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "application/json".to_string()),
                text: text.clone(),
            }),
            (None, None) => None,
        };
        Self {
            name: c.name.clone(),
            section: c.section,
            method: c.method,
            path: c.path.clone(),
            body,
            expect_status: c.expect_status,
            any_success: false,
            expect_json: c.expect_json,
        }
    }
}

// ── Derived values ───────────────────────────────────────────────────────────

impl OutpostConfig {
    /// Where the git checkout lives, if a repository is configured.
    #[must_use]
    pub fn checkout_dir(&self) -> Option<PathBuf> {
        self.service
            .repository
            .as_ref()
            .map(|_| self.service.install_dir.join(CHECKOUT_DIR))
    }

    /// Directory the service process runs from.
    #[must_use]
    pub fn working_dir(&self) -> PathBuf {
        self.checkout_dir()
            .unwrap_or_else(|| self.service.install_dir.clone())
    }

    /// Environment entries in the order they are written.
    #[must_use]
    pub fn environment(&self) -> Vec<(String, String)> {
        let svc = &self.service;
        let mut env = vec![
            (ENV_HOST.to_string(), svc.host.clone()),
            (ENV_PORT.to_string(), svc.port.to_string()),
            (ENV_LOG_LEVEL.to_string(), svc.log_level.clone()),
        ];
        env.extend(
            svc.features
                .iter()
                .map(|(name, on)| (feature_key(name), on.to_string())),
        );
        env
    }

    /// The one typed definition both the unit and the env file render from.
    #[must_use]
    pub fn service_definition(&self) -> ServiceDefinition {
        let svc = &self.service;
        ServiceDefinition {
            name: svc.name.clone(),
            description: svc.description.clone(),
            exec_start: svc.exec.clone(),
            working_dir: self.working_dir(),
            install_dir: svc.install_dir.clone(),
            environment: self.environment(),
            restart: RestartPolicy::Always {
                backoff_secs: svc.restart_secs,
            },
            account: svc.account.clone(),
        }
    }

    /// Host and port the verifier targets.
    #[must_use]
    pub fn verify_target(&self) -> (String, u16) {
        (
            self.verify
                .host
                .clone()
                .unwrap_or_else(|| self.service.host.clone()),
            self.verify.port.unwrap_or(self.service.port),
        )
    }

    /// The battery the verifier runs.
    #[must_use]
    pub fn battery(&self) -> Battery {
        let mut battery = default_battery();
        if let Some(checks) = &self.verify.checks {
            battery.checks = checks.iter().map(CheckSpec::from).collect();
        }
        if let Some(path) = &self.verify.load_path {
            battery.load_path = Some(path.clone());
        }
        if self.verify.requests == 0 {
            battery.load_path = None;
        }
        battery
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates an account or service name.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the name does not match [`NAME_RE`].
pub fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if NAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field: field.to_string(),
            reason: format!("'{value}' must match {}", NAME_RE.as_str()),
        })
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Validates the whole configuration. Returns `Ok(())` or an error listing
/// all violations.
///
/// # Errors
///
/// Returns [`ConfigError::Violations`] if any check fails.
pub fn validate(cfg: &OutpostConfig) -> Result<()> {
    let mut errors: Vec<ConfigError> = Vec::new();
    let svc = &cfg.service;

    if let Err(e) = validate_name("service.name", &svc.name) {
        errors.push(e);
    }
    if let Err(e) = validate_name("service.account", &svc.account) {
        errors.push(e);
    }
    if svc.account == "root" {
        errors.push(invalid("service.account", "the service must not run as root"));
    }
    if !svc.install_dir.is_absolute() {
        errors.push(invalid(
            "service.install_dir",
            format!("'{}' must be an absolute path", svc.install_dir.display()),
        ));
    }
    if svc.exec.first().is_none_or(String::is_empty) {
        errors.push(invalid("service.exec", "must name an executable"));
    }
    // These land in the unit file or on the git command line, one value
    // per line.
    let install_dir = svc.install_dir.to_string_lossy();
    let single_line = [
        ("service.description", svc.description.as_str()),
        ("service.install_dir", install_dir.as_ref()),
        ("service.repository", svc.repository.as_deref().unwrap_or_default()),
        ("service.branch", svc.branch.as_str()),
    ]
    .into_iter()
    .chain(svc.exec.iter().map(|arg| ("service.exec", arg.as_str())));
    for (field, value) in single_line {
        if value.contains(['\n', '\r']) {
            errors.push(invalid(field, "must not contain line breaks"));
        }
    }
    if svc.port == 0 {
        errors.push(invalid("service.port", "must be between 1 and 65535"));
    }
    if svc.repository.is_some() && svc.branch.trim().is_empty() {
        errors.push(invalid("service.branch", "must not be empty"));
    }
    if svc.settle_secs == 0 {
        errors.push(invalid("service.settle_secs", "must be at least 1"));
    }
    for name in svc.features.keys() {
        let key = feature_key(name);
        if validate_key(&key).is_err() || key == FEATURE_PREFIX {
            errors.push(invalid(
                "service.features",
                format!("'{name}' does not produce a valid environment key ({key})"),
            ));
        }
    }
    for (i, entry) in cfg.setup.iter().enumerate() {
        if entry.command.first().is_none_or(String::is_empty) {
            errors.push(invalid(&format!("setup[{i}].command"), "must not be empty"));
        }
    }
    if cfg.verify.port == Some(0) {
        errors.push(invalid("verify.port", "must be between 1 and 65535"));
    }
    if cfg.verify.timeout_secs == 0 {
        errors.push(invalid("verify.timeout_secs", "must be at least 1"));
    }
    if let Some(path) = &cfg.verify.load_path {
        if !path.starts_with('/') {
            errors.push(invalid("verify.load_path", format!("'{path}' must start with '/'")));
        }
    }
    for check in cfg.verify.checks.iter().flatten() {
        let field = format!("verify.checks.{}", check.name);
        if check.section == Section::Connectivity || check.section == Section::Load {
            errors.push(invalid(
                &field,
                "section must be 'contract' or 'error_path'",
            ));
        }
        if !check.path.starts_with('/') {
            errors.push(invalid(&field, format!("path '{}' must start with '/'", check.path)));
        }
        if check.body.is_some() && check.raw_body.is_some() {
            errors.push(invalid(&field, "set either body or raw_body, not both"));
        }
        if !(100..=599).contains(&check.expect_status) {
            errors.push(invalid(
                &field,
                format!("expect_status {} is not an HTTP status", check.expect_status),
            ));
        }
    }

    if errors.is_empty() {
        return Ok(());
    }
    let lines: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
    Err(ConfigError::Violations(lines.join("\n")).into())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
