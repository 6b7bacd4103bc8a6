//! Application context: unified state passed to every command handler.
//!
//! Adding a cross-cutting concern (a new global flag, a different config
//! source) is one field change here; command signatures stay put.

use std::path::PathBuf;

use anyhow::Result;

use crate::infra::config::YamlConfigStore;
use crate::output::{
    HumanRenderer, JsonRenderer, OutputContext, Renderer, Reporter, SilentReporter,
    TerminalReporter,
};

/// Environment variable that implies `--yes`.
pub const YES_ENV: &str = "OUTPOST_YES";

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `OUTPOST_YES` env vars).
    pub yes: bool,
    /// Explicit config file path (`--config`).
    pub config: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Where the YAML configuration comes from.
    pub config_store: YamlConfigStore,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set by `--yes`, or when `CI` or `OUTPOST_YES` is present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var(YES_ENV).is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config_store: YamlConfigStore::new(flags.behaviour.config),
            non_interactive,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter for long-running services. Silent in JSON mode.
    #[must_use]
    pub fn reporter(&self) -> Reporter<'_> {
        match self.mode {
            OutputMode::Human => Reporter::Terminal(TerminalReporter::new(&self.output)),
            OutputMode::Json => Reporter::Silent(SilentReporter),
        }
    }

    /// Ask the user for confirmation.
    ///
    /// In non-interactive or JSON mode, returns `default` without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive || self.is_json() {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
