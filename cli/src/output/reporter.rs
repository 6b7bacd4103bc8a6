//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// On a TTY, `step()` opens a spinner that the next `success()`/`fail()`
/// resolves in place. Otherwise every event is one line:
///
/// - `step()` prints `"  → {message}"` (suppressed when `ctx.quiet`)
/// - `success()` prints `"  ✓ {message}"` (suppressed when `ctx.quiet`)
/// - `warn()` prints `"  ! {message}"` (suppressed when `ctx.quiet`)
/// - `fail()` prints `"  ✗ {message}"` to stderr (never suppressed)
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: RefCell::new(None),
        }
    }

    /// Print above a running spinner, or plainly when there is none.
    fn line(&self, text: &str) {
        match self.active.borrow().as_ref() {
            Some(pb) => pb.println(text),
            None => println!("{text}"),
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if self.ctx.show_progress() {
            if let Some(previous) = self.active.replace(Some(progress::spinner(message))) {
                previous.finish_and_clear();
            }
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.accent));
        }
    }

    fn success(&self, message: &str) {
        let active = self.active.take();
        if self.ctx.quiet {
            return;
        }
        match active {
            Some(pb) => progress::finish_ok(&pb, message),
            None => println!("  {} {message}", "✓".style(self.ctx.styles.success)),
        }
    }

    fn warn(&self, message: &str) {
        if !self.ctx.quiet {
            self.line(&format!("  {} {message}", "!".style(self.ctx.styles.warning)));
        }
    }

    fn fail(&self, message: &str) {
        match self.active.take() {
            Some(pb) => progress::finish_error(&pb, message),
            None => eprintln!("  {} {message}", "✗".style(self.ctx.styles.error)),
        }
    }

    fn detail(&self, message: &str) {
        if !self.ctx.quiet {
            self.line(&format!("      {}", message.style(self.ctx.styles.dim)));
        }
    }
}

/// Reporter that drops every event; used in JSON mode so stdout carries
/// exactly one document.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn fail(&self, _message: &str) {}
    fn detail(&self, _message: &str) {}
}

/// Reporter picked by `AppContext::reporter()` for the current output mode.
pub enum Reporter<'a> {
    Terminal(TerminalReporter<'a>),
    Silent(SilentReporter),
}

impl ProgressReporter for Reporter<'_> {
    fn step(&self, message: &str) {
        match self {
            Self::Terminal(r) => r.step(message),
            Self::Silent(r) => r.step(message),
        }
    }

    fn success(&self, message: &str) {
        match self {
            Self::Terminal(r) => r.success(message),
            Self::Silent(r) => r.success(message),
        }
    }

    fn warn(&self, message: &str) {
        match self {
            Self::Terminal(r) => r.warn(message),
            Self::Silent(r) => r.warn(message),
        }
    }

    fn fail(&self, message: &str) {
        match self {
            Self::Terminal(r) => r.fail(message),
            Self::Silent(r) => r.fail(message),
        }
    }

    fn detail(&self, message: &str) {
        match self {
            Self::Terminal(r) => r.detail(message),
            Self::Silent(r) => r.detail(message),
        }
    }
}
