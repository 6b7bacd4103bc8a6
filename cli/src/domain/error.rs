//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Fatal provisioning failures. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(
        "Provisioning requires root privileges (target account '{account}'). Re-run with sudo."
    )]
    PermissionDenied { account: String },

    #[error("Step {} '{step}' failed: {cause}", .index + 1)]
    StepFailed {
        index: usize,
        step: String,
        cause: String,
    },

    #[error(
        "Service '{service}' did not reach a running state (supervisor reports '{state}').\nInspect it with: journalctl -u {service}"
    )]
    SupervisorStartFailed { service: String, state: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Configuration is invalid:\n{0}")]
    Violations(String),
}
