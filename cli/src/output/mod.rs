//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::path::Path;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::{Reporter, SilentReporter, TerminalReporter};
pub use styles::Styles;

use crate::application::services::verify::Exchange;
use crate::domain::config::OutpostConfig;
use crate::domain::plan::ProvisionSummary;
use crate::domain::probe::Report;
use crate::domain::supervisor::ServiceState;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Mode-specific renderer handed out by `AppContext::renderer()`.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_version(version),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_provision_summary(&self, summary: &ProvisionSummary) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_provision_summary(summary);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_provision_summary(summary),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_report(&self, report: &Report) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_report(report);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_report(report),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_exchange(&self, exchange: &Exchange) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_exchange(exchange);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_exchange(exchange),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_status(&self, service: &str, state: &ServiceState) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_status(service, state);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_status(service, state),
        }
    }

    /// # Errors
    ///
    /// Returns an error if YAML or JSON serialization fails.
    pub fn render_config(&self, config: &OutpostConfig, path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                let yaml = serde_yaml::to_string(config)?;
                r.render_config(&yaml, path, path.exists());
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_config(config, path),
        }
    }
}
