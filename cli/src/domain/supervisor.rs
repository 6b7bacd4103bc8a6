//! Supervisor-reported service state.

use std::fmt;

use serde::Serialize;

/// Service state as reported by the process supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Active,
    Activating,
    Deactivating,
    Inactive,
    Failed,
    /// Anything else the supervisor printed, kept verbatim.
    Unknown(String),
}

impl ServiceState {
    /// Parse the single-word output of `systemctl is-active`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "active" | "reloading" => Self::Active,
            "activating" => Self::Activating,
            "deactivating" => Self::Deactivating,
            "inactive" => Self::Inactive,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Activating => f.write_str("activating"),
            Self::Deactivating => f.write_str("deactivating"),
            Self::Inactive => f.write_str("inactive"),
            Self::Failed => f.write_str("failed"),
            Self::Unknown(raw) if raw.is_empty() => f.write_str("unknown"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}
