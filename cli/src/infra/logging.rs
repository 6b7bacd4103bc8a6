//! Tracing subscriber setup. Logs go to stderr so stdout stays parseable.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "OUTPOST_LOG";

/// Filter directive for a `-v` count; `None` defers to the environment.
#[must_use]
pub fn verbosity_directive(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        _ => Some("debug"),
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing(verbose: u8, color: bool) {
    let filter = match verbosity_directive(verbose) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false)
        .try_init();
}
