//! Flat `KEY=value` environment file codec.
//!
//! One writer and one parser for the file the provisioner persists and the
//! service (and the supervisor's `EnvironmentFile=`) reads at startup.
//!
//! Format:
//! - one `KEY=value` per line, in declaration order, no nesting
//! - keys match `[A-Z_][A-Z0-9_]*`
//! - values are single-line; values containing whitespace, `#`, quotes,
//!   `$` or backslashes are written double-quoted with `\"` and `\\` escapes
//! - blank lines and lines starting with `#` are ignored by the parser

use thiserror::Error;

/// Errors produced while rendering or parsing an environment file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvFileError {
    #[error("invalid environment key '{0}': must match [A-Z_][A-Z0-9_]*")]
    InvalidKey(String),

    #[error("value for '{0}' spans multiple lines")]
    MultilineValue(String),

    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },
}

/// Validate an environment key.
///
/// # Errors
///
/// Returns [`EnvFileError::InvalidKey`] when the key is empty or contains
/// characters outside `[A-Z0-9_]`, or starts with a digit.
pub fn validate_key(key: &str) -> Result<(), EnvFileError> {
    let mut chars = key.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(EnvFileError::InvalidKey(key.to_string()))
    }
}

fn needs_quoting(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\' | '$'))
}

/// Render entries as environment file content (trailing newline included).
///
/// # Errors
///
/// Returns an error if a key is invalid or a value contains a line break.
pub fn render(entries: &[(String, String)]) -> Result<String, EnvFileError> {
    let mut out = String::new();
    for (key, value) in entries {
        validate_key(key)?;
        if value.contains('\n') || value.contains('\r') {
            return Err(EnvFileError::MultilineValue(key.clone()));
        }
        out.push_str(key);
        out.push('=');
        if needs_quoting(value) {
            out.push('"');
            for c in value.chars() {
                if matches!(c, '"' | '\\') {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        } else {
            out.push_str(value);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Parse environment file content into ordered entries.
///
/// # Errors
///
/// Returns an error for lines without `=`, invalid keys, or unterminated
/// quoted values.
pub fn parse(content: &str) -> Result<Vec<(String, String)>, EnvFileError> {
    let mut entries = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, rest)) = line.split_once('=') else {
            return Err(EnvFileError::Syntax {
                line: line_no,
                reason: "expected KEY=value".to_string(),
            });
        };
        let key = key.trim();
        validate_key(key)?;
        let value = match rest.strip_prefix('"') {
            Some(quoted) => parse_quoted(quoted, line_no)?,
            None => rest.trim().to_string(),
        };
        entries.push((key.to_string(), value));
    }
    Ok(entries)
}

fn parse_quoted(quoted: &str, line: usize) -> Result<String, EnvFileError> {
    let mut value = String::new();
    let mut chars = quoted.chars();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(c) => value.push(c),
                None => break,
            },
            Some('"') => {
                let trailing = chars.as_str().trim();
                if !trailing.is_empty() && !trailing.starts_with('#') {
                    return Err(EnvFileError::Syntax {
                        line,
                        reason: format!("unexpected text after closing quote: {trailing}"),
                    });
                }
                return Ok(value);
            }
            Some(c) => value.push(c),
            None => break,
        }
    }
    Err(EnvFileError::Syntax {
        line,
        reason: "unterminated quoted value".to_string(),
    })
}
