use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::conventions::ENV_FILE_NAME;
use crate::env_file::{self, EnvFileError};

/// How the supervisor restarts the service after it exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Restart on every exit, waiting `backoff_secs` between attempts.
    Always { backoff_secs: u64 },
    /// Restart only on non-zero exit or signal.
    OnFailure { backoff_secs: u64 },
    /// Never restart.
    Never,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::Always { backoff_secs: 10 }
    }
}

/// Persisted description of the long-running process a supervisor runs.
///
/// Created once by the final provisioning step and read by the supervisor
/// at service start. The environment entries keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Unit name, without the `.service` suffix.
    pub name: String,
    /// One-line description shown by the supervisor.
    pub description: String,
    /// Executable path followed by its arguments.
    pub exec_start: Vec<String>,
    /// Working directory of the process.
    pub working_dir: PathBuf,
    /// Directory holding the environment file.
    pub install_dir: PathBuf,
    /// Flat environment handed to the process.
    pub environment: Vec<(String, String)>,
    /// Restart behaviour after exit.
    #[serde(default)]
    pub restart: RestartPolicy,
    /// Unprivileged account the process runs as.
    pub account: String,
}

impl ServiceDefinition {
    /// Path of the environment file referenced by the unit.
    #[must_use]
    pub fn env_file_path(&self) -> PathBuf {
        env_file_path(&self.install_dir)
    }

    /// Render the environment file content.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry has an invalid key or multi-line value.
    pub fn render_env(&self) -> Result<String, EnvFileError> {
        env_file::render(&self.environment)
    }

    /// Look up an environment value by key.
    #[must_use]
    pub fn env(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Environment file location for an install directory.
#[must_use]
pub fn env_file_path(install_dir: &Path) -> PathBuf {
    install_dir.join(ENV_FILE_NAME)
}
