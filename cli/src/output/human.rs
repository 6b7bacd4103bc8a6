//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;

use crate::application::services::verify::Exchange;
use crate::domain::config::OutpostConfig;
use crate::domain::plan::ProvisionSummary;
use crate::domain::probe::{Report, Section};
use crate::domain::supervisor::ServiceState;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("outpost v{version}"));
    }

    /// Render the per-step tally after provisioning.
    pub fn render_provision_summary(&self, summary: &ProvisionSummary) {
        if self.ctx.quiet {
            return;
        }
        println!();
        let title = if summary.dry_run {
            format!("Dry run for {} (nothing was changed)", summary.service)
        } else {
            format!("Provisioned {}", summary.service)
        };
        self.ctx.header(&title);
        println!();
        println!(
            "  {:<16} {:>8} {:>10} {:>8}",
            "step".style(self.ctx.styles.dim),
            "changed".style(self.ctx.styles.dim),
            "unchanged".style(self.ctx.styles.dim),
            "skipped".style(self.ctx.styles.dim),
        );
        for step in &summary.steps {
            println!(
                "  {:<16} {:>8} {:>10} {:>8}",
                step.name, step.changed, step.unchanged, step.skipped
            );
        }
        println!();
        if !summary.dry_run {
            match summary.changed() {
                0 => self.ctx.success("host already up to date"),
                n => self.ctx.success(&format!("{n} change(s) applied")),
            }
        }
    }

    /// Print the artifacts a dry run would write.
    pub fn render_artifacts(&self, unit_path: &Path, unit: &str, env_path: &Path, env: &str) {
        if self.ctx.quiet {
            return;
        }
        for (path, content) in [(unit_path, unit), (env_path, env)] {
            println!();
            self.ctx.header(&path.display().to_string());
            for line in content.lines() {
                println!("    {line}");
            }
        }
    }

    /// Render the verifier summary table and verdict.
    pub fn render_report(&self, report: &Report) {
        if !self.ctx.quiet {
            println!();
            self.ctx.header(&format!("Verification of {}", report.target));
            println!();
            println!(
                "  {:<13} {:<18} {:<7} {:<28} {:>4} {:>4} {:>9}  {}",
                "section".style(self.ctx.styles.dim),
                "check".style(self.ctx.styles.dim),
                "method".style(self.ctx.styles.dim),
                "path".style(self.ctx.styles.dim),
                "exp".style(self.ctx.styles.dim),
                "got".style(self.ctx.styles.dim),
                "ms".style(self.ctx.styles.dim),
                "result".style(self.ctx.styles.dim),
            );
            for r in &report.results {
                let observed = r.observed.map_or_else(|| "-".to_string(), |s| s.to_string());
                let verdict = match r.reason() {
                    None => format!("{}", "pass".style(self.ctx.styles.success)),
                    Some(reason) if r.section == Section::Load => {
                        format!("{} ({reason})", "warn".style(self.ctx.styles.warning))
                    }
                    Some(reason) => {
                        format!("{} ({reason})", "fail".style(self.ctx.styles.error))
                    }
                };
                println!(
                    "  {:<13} {:<18} {:<7} {:<28} {:>4} {:>4} {:>9.1}  {verdict}",
                    r.section.to_string(),
                    r.check,
                    r.method.as_str(),
                    r.path,
                    r.expected,
                    observed,
                    r.latency.as_secs_f64() * 1000.0,
                );
            }
            if let Some(load) = &report.load {
                println!();
                self.ctx.kv(
                    "Load:",
                    &format!(
                        "{}/{} succeeded on {} | wall {:.1} ms | avg {:.1} ms | max {:.1} ms",
                        load.succeeded,
                        load.requests,
                        load.path,
                        load.wall.as_secs_f64() * 1000.0,
                        load.average.as_secs_f64() * 1000.0,
                        load.max.as_secs_f64() * 1000.0,
                    ),
                );
            }
            println!();
        }

        let hard = report
            .results
            .iter()
            .filter(|r| r.section != Section::Load)
            .count();
        let failed = report.failures().count();
        if !report.reachable {
            self.ctx
                .error(&format!("service unreachable at {}", report.target));
        } else if report.passed() {
            self.ctx.success(&format!("{hard}/{hard} checks passed"));
        } else {
            self.ctx
                .error(&format!("{failed} of {hard} checks failed"));
        }
    }

    /// Render a single request/response exchange.
    pub fn render_exchange(&self, exchange: &Exchange) {
        let status = format!("HTTP {}", exchange.status);
        let styled = status.style(self.ctx.styles.http_status(exchange.status));
        if !self.ctx.quiet {
            println!(
                "  {} {}  {styled}  {}",
                exchange.method.as_str().style(self.ctx.styles.bold),
                exchange.url,
                format!("{:.1} ms", exchange.latency.as_secs_f64() * 1000.0)
                    .style(self.ctx.styles.dim),
            );
        }
        println!("{}", body_text(&exchange.body));
    }

    /// Render the supervisor state of the service.
    pub fn render_status(&self, service: &str, state: &ServiceState) {
        if state.is_running() {
            self.ctx.success(&format!("{service} is {state}"));
        } else {
            self.ctx.error(&format!("{service} is {state}"));
        }
    }

    /// Render the effective configuration.
    pub fn render_config(&self, yaml: &str, path: &Path, exists: bool) {
        println!();
        let source = if exists { "" } else { " - not found, defaults" };
        println!(
            "  {}",
            format!("Configuration ({}{source})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        for line in yaml.lines() {
            println!("  {line}");
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["OUTPOST_CONFIG", "OUTPOST_LOG", "NO_COLOR"] {
            println!(
                "    {:<18} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }

    /// Render the path of the configuration file.
    pub fn render_config_path(&self, path: &Path) {
        println!("{}", path.display());
    }

    /// Render the derived service definition in short form.
    pub fn render_service_overview(&self, cfg: &OutpostConfig) {
        if self.ctx.quiet {
            return;
        }
        let svc = &cfg.service;
        self.ctx.kv("Service:", &svc.name);
        self.ctx.kv("Account:", &svc.account);
        self.ctx.kv("Install dir:", &svc.install_dir.display().to_string());
        self.ctx.kv("Listen:", &format!("{}:{}", svc.host, svc.port));
        println!();
    }
}

/// Pretty JSON when the body parses, raw text otherwise.
#[must_use]
pub fn body_text(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned()),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}
