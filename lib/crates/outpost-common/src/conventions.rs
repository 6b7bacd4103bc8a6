//! Fixed conventions between the provisioner and the service it installs.
//!
//! The service reads its listen address and log level from the environment
//! file the provisioner writes; the verifier targets the same host/port.

/// Default listen host for the provisioned service.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port for the provisioned service.
pub const DEFAULT_PORT: u16 = 8000;

/// Default log level handed to the service.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment file name, written into the install directory.
pub const ENV_FILE_NAME: &str = "outpost.env";

/// Environment key carrying the listen host.
pub const ENV_HOST: &str = "OUTPOST_HOST";

/// Environment key carrying the listen port.
pub const ENV_PORT: &str = "OUTPOST_PORT";

/// Environment key carrying the service log level.
pub const ENV_LOG_LEVEL: &str = "OUTPOST_LOG_LEVEL";

/// Prefix for feature-flag keys (`FEATURE_<NAME>=true|false`).
pub const FEATURE_PREFIX: &str = "FEATURE_";

/// Build the environment key for a feature flag name.
///
/// Non-alphanumeric characters become `_` and the name is upper-cased, so
/// `message-store` maps to `FEATURE_MESSAGE_STORE`.
#[must_use]
pub fn feature_key(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{FEATURE_PREFIX}{normalized}")
}
