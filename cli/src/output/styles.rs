//! Stylesheet for terminal output, built on owo-colors.

use owo_colors::Style;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Warning messages (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Info messages (blue)
    pub info: Style,
    /// Dimmed/secondary text
    pub dim: Style,
    /// Bold text
    pub bold: Style,
    /// Headers/section titles
    pub header: Style,
    /// Step arrows, spinners and the load line
    pub accent: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
        self.accent = Style::new().cyan();
    }

    /// Style for an HTTP status code: 2xx/3xx green, 4xx yellow, 5xx red.
    #[must_use]
    pub fn http_status(&self, status: u16) -> Style {
        match status {
            200..=399 => self.success,
            400..=499 => self.warning,
            _ => self.error,
        }
    }
}
