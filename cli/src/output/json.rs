//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed document on
//! stdout, including failures.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::services::verify::Exchange;
use crate::domain::config::OutpostConfig;
use crate::domain::plan::ProvisionSummary;
use crate::domain::probe::Report;
use crate::domain::supervisor::ServiceState;

/// Renders domain types as machine-readable JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &impl Serialize) -> Result<()> {
        let text = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{text}");
        Ok(())
    }

    /// Render the CLI version information.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "version": version }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_provision_summary(summary: &ProvisionSummary) -> Result<()> {
        Self::print(&serde_json::json!({
            "service": summary.service,
            "dry_run": summary.dry_run,
            "changed": summary.changed(),
            "steps": summary.steps,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_report(report: &Report) -> Result<()> {
        Self::print(&serde_json::json!({
            "passed": report.passed(),
            "report": report,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_exchange(exchange: &Exchange) -> Result<()> {
        let body = match serde_json::from_slice::<serde_json::Value>(&exchange.body) {
            Ok(value) => value,
            Err(_) => serde_json::Value::String(String::from_utf8_lossy(&exchange.body).into_owned()),
        };
        Self::print(&serde_json::json!({
            "method": exchange.method,
            "url": exchange.url,
            "status": exchange.status,
            "latency_ms": exchange.latency.as_secs_f64() * 1000.0,
            "body": body,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_status(service: &str, state: &ServiceState) -> Result<()> {
        Self::print(&serde_json::json!({
            "service": service,
            "state": state.to_string(),
            "running": state.is_running(),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config(config: &OutpostConfig, path: &std::path::Path) -> Result<()> {
        Self::print(&serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        }))
    }
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
