//! Provisioning plan model: steps, actions, success checks, run context.
//!
//! Pure data; the provisioning service interprets it through ports.

use std::fmt;
use std::path::PathBuf;

use outpost_common::ServiceDefinition;
use serde::Serialize;

/// Who owns a file written by the provisioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// Left owned by the elevated identity running the provisioner.
    Root,
    /// Handed to the target account.
    Account,
}

/// One shell-level unit of work inside a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Install OS packages that are not yet present.
    InstallPackages { packages: Vec<String> },
    /// Create the unprivileged system account; no-op if it exists.
    EnsureAccount { name: String, home: PathBuf },
    /// Create a directory owned by the target account; no-op if present.
    EnsureDir { path: PathBuf, mode: u32 },
    /// Write a file, only touching it when the content differs.
    WriteFile {
        path: PathBuf,
        contents: String,
        mode: u32,
        owner: Owner,
    },
    /// Clone a repository, or fast-forward it when already cloned.
    GitSync {
        repository: String,
        branch: String,
        dest: PathBuf,
    },
    /// Run a command; skipped when `creates` already exists.
    Run {
        program: String,
        args: Vec<String>,
        as_account: bool,
        dir: Option<PathBuf>,
        creates: Option<PathBuf>,
    },
    /// Register, enable and start the service with the supervisor.
    RegisterService(Box<ServiceDefinition>),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstallPackages { packages } => {
                write!(f, "install packages: {}", packages.join(" "))
            }
            Self::EnsureAccount { name, .. } => write!(f, "ensure account {name}"),
            Self::EnsureDir { path, mode } => {
                write!(f, "ensure directory {} ({mode:o})", path.display())
            }
            Self::WriteFile { path, mode, .. } => {
                write!(f, "write {} ({mode:o})", path.display())
            }
            Self::GitSync {
                repository,
                branch,
                dest,
            } => write!(f, "sync {repository}@{branch} into {}", dest.display()),
            Self::Run { program, args, .. } => {
                write!(f, "run {program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Self::RegisterService(def) => write!(f, "register service {}", def.name),
        }
    }
}

/// Success predicate evaluated after a step's actions ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// The actions' own results are sufficient.
    Always,
    /// The given path must exist afterwards.
    PathExists(PathBuf),
    /// The given command must exit zero.
    CommandSucceeds { program: String, args: Vec<String> },
    /// The supervisor must report the named service as running.
    ServiceRunning(String),
}

/// An ordered unit of provisioning work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    /// Whether re-running the step is harmless.
    pub idempotent: bool,
    pub actions: Vec<Action>,
    pub check: Check,
}

impl Step {
    /// Start an idempotent step with no actions and no extra check.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            idempotent: true,
            actions: Vec::new(),
            check: Check::Always,
        }
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.check = check;
        self
    }

    #[must_use]
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }
}

/// Statically declared, ordered step list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    #[must_use]
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Explicit run inputs that would otherwise be ambient process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Unprivileged account that will own files and run the service.
    pub account: String,
    /// Root of everything installed for the account.
    pub install_dir: PathBuf,
    /// Whether the provisioner holds elevated privilege.
    pub elevated: bool,
    /// Describe actions without mutating the host.
    pub dry_run: bool,
}

/// Result of executing one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Host state was modified.
    Changed,
    /// Host state already matched.
    Unchanged,
    /// The action was not executed (guard or dry run).
    Skipped,
}

/// Per-step tally reported after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    pub changed: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl StepReport {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            changed: 0,
            unchanged: 0,
            skipped: 0,
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Changed => self.changed += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// Summary of a completed provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionSummary {
    pub service: String,
    pub dry_run: bool,
    pub steps: Vec<StepReport>,
}

impl ProvisionSummary {
    /// Total number of actions that modified the host.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.steps.iter().map(|s| s.changed).sum()
    }
}
