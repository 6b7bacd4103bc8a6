//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use outpost_common::ServiceDefinition;

use crate::domain::config::OutpostConfig;
use crate::domain::plan::Outcome;
use crate::domain::probe::{HttpReply, HttpRequest, TransportError};
use crate::domain::supervisor::ServiceState;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Timeout for package installs, clones and setup commands.
pub const LONG_COMMAND_TIMEOUT: Duration = Duration::from_secs(900);

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program from `dir` with a custom timeout.
    async fn run_in(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Host Ports ────────────────────────────────────────────────────────────────

/// Abstracts the host filesystem the provisioner mutates.
pub trait HostFs {
    fn exists(&self, path: &Path) -> bool;
    /// Read a file, returning `None` when it does not exist.
    fn read_to_string(&self, path: &Path) -> Result<Option<String>>;
    /// Create a directory and its parents. Returns `true` if it was created.
    fn create_dir(&self, path: &Path, mode: u32) -> Result<bool>;
    /// Replace a file's content and set its mode.
    fn write(&self, path: &Path, contents: &str, mode: u32) -> Result<()>;
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;
    /// Hand a path to the named account (user and primary group).
    fn chown(&self, path: &Path, account: &str) -> Result<()>;
}

/// Abstracts OS account management.
#[allow(async_fn_in_trait)]
pub trait AccountManager {
    /// Create a system account with no login shell unless it already exists.
    async fn ensure_account(&self, name: &str, home: &Path) -> Result<Outcome>;
}

/// Abstracts the OS package manager.
#[allow(async_fn_in_trait)]
pub trait PackageInstaller {
    /// Install whichever of `packages` are missing.
    async fn install(&self, packages: &[String]) -> Result<Outcome>;
}

/// Abstracts the process supervisor that keeps the service running.
#[allow(async_fn_in_trait)]
pub trait ServiceSupervisor {
    /// Write (or refresh) the service registration and reload the supervisor.
    /// Returns `Unchanged` when the registration was already current.
    async fn register(&self, def: &ServiceDefinition) -> Result<Outcome>;
    /// Enable start at boot.
    async fn enable(&self, name: &str) -> Result<()>;
    async fn start(&self, name: &str) -> Result<()>;
    async fn restart(&self, name: &str) -> Result<()>;
    /// Current state as reported by the supervisor.
    async fn state(&self, name: &str) -> Result<ServiceState>;
}

// ── HTTP Probe Port ───────────────────────────────────────────────────────────

/// Abstracts HTTP requests so the verifier can be tested without a network.
#[allow(async_fn_in_trait)]
pub trait HttpProbe {
    /// Base URL requests are resolved against.
    fn base_url(&self) -> &str;
    /// Send one request and return the raw reply.
    async fn send(&self, request: &HttpRequest) -> Result<HttpReply, TransportError>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Synchronous.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit a failure message.
    fn fail(&self, message: &str);
    /// Emit a detail line under the current step.
    fn detail(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts loading configuration.
pub trait ConfigStore {
    /// Load the config, returning defaults if the file does not exist.
    fn load(&self) -> Result<OutpostConfig>;
    /// Path of the config file.
    fn path(&self) -> Result<PathBuf>;
}
