//! Application service: provision use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use outpost_common::ServiceDefinition;

use crate::application::ports::{
    AccountManager, CommandRunner, HostFs, LONG_COMMAND_TIMEOUT, PackageInstaller,
    ProgressReporter, ServiceSupervisor,
};
use crate::domain::error::ProvisionError;
use crate::domain::plan::{
    Action, Check, ExecutionContext, Outcome, Owner, Plan, ProvisionSummary, Step, StepReport,
};
use crate::domain::supervisor::ServiceState;

/// Consecutive `active` polls required before the service counts as up.
pub const REQUIRED_ACTIVE_POLLS: u32 = 2;

/// The host-mutating ports a provisioning run needs.
pub struct Host<'a, C, F, A, P, S> {
    pub runner: &'a C,
    pub fs: &'a F,
    pub accounts: &'a A,
    pub packages: &'a P,
    pub supervisor: &'a S,
}

/// Supervisor settling parameters.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionOptions {
    /// How long the supervisor gets to report the service active.
    pub settle: Duration,
    pub poll_interval: Duration,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Run every step of `plan` in order, stopping at the first failure.
///
/// # Errors
///
/// - [`ProvisionError::PermissionDenied`] when not elevated (checked before
///   any port is touched, skipped for dry runs).
/// - [`ProvisionError::StepFailed`] for the first failing action or check.
/// - [`ProvisionError::SupervisorStartFailed`] when the service never settles.
pub async fn provision<C, F, A, P, S>(
    host: &Host<'_, C, F, A, P, S>,
    plan: &Plan,
    ctx: &ExecutionContext,
    opts: &ProvisionOptions,
    reporter: &impl ProgressReporter,
) -> Result<ProvisionSummary>
where
    C: CommandRunner,
    F: HostFs,
    A: AccountManager,
    P: PackageInstaller,
    S: ServiceSupervisor,
{
    if !ctx.dry_run && !ctx.elevated {
        return Err(ProvisionError::PermissionDenied {
            account: ctx.account.clone(),
        }
        .into());
    }

    let mut summary = ProvisionSummary {
        service: service_name(plan).unwrap_or_default(),
        dry_run: ctx.dry_run,
        steps: Vec::with_capacity(plan.len()),
    };
    let total = plan.len();
    // Set once any earlier action changed the host; a running service is
    // restarted so it picks the change up.
    let mut dirty = false;

    for (index, step) in plan.steps().iter().enumerate() {
        let label = format!("[{}/{total}] {}", index + 1, step.name);
        reporter.step(&label);
        tracing::info!(step = %step.name, index, idempotent = step.idempotent, "running step");

        match run_step(host, step, ctx, opts, &mut dirty, reporter).await {
            Ok(report) => {
                reporter.success(&label);
                summary.steps.push(report);
            }
            Err(err) => {
                reporter.fail(&label);
                tracing::warn!(step = %step.name, index, error = %format!("{err:#}"), "step failed");
                return Err(step_failure(index, step, err));
            }
        }
    }

    Ok(summary)
}

fn service_name(plan: &Plan) -> Option<String> {
    plan.steps()
        .iter()
        .flat_map(|s| &s.actions)
        .find_map(|a| match a {
            Action::RegisterService(def) => Some(def.name.clone()),
            _ => None,
        })
}

/// Supervisor errors pass through; anything else becomes `StepFailed`.
fn step_failure(index: usize, step: &Step, err: anyhow::Error) -> anyhow::Error {
    match err.downcast::<ProvisionError>() {
        Ok(fatal) => fatal.into(),
        Err(err) => ProvisionError::StepFailed {
            index,
            step: step.name.clone(),
            cause: format!("{err:#}"),
        }
        .into(),
    }
}

async fn run_step<C, F, A, P, S>(
    host: &Host<'_, C, F, A, P, S>,
    step: &Step,
    ctx: &ExecutionContext,
    opts: &ProvisionOptions,
    dirty: &mut bool,
    reporter: &impl ProgressReporter,
) -> Result<StepReport>
where
    C: CommandRunner,
    F: HostFs,
    A: AccountManager,
    P: PackageInstaller,
    S: ServiceSupervisor,
{
    let mut report = StepReport::new(&step.name);
    for action in &step.actions {
        let outcome = if ctx.dry_run {
            reporter.detail(&format!("would {action}"));
            Outcome::Skipped
        } else {
            tracing::debug!(%action, "executing action");
            let outcome = execute(host, action, ctx, opts, *dirty, reporter).await?;
            tracing::debug!(%action, ?outcome, "action finished");
            outcome
        };
        if outcome == Outcome::Changed {
            *dirty = true;
        }
        report.record(outcome);
    }
    if !ctx.dry_run {
        verify_check(host, &step.check).await?;
    }
    Ok(report)
}

async fn execute<C, F, A, P, S>(
    host: &Host<'_, C, F, A, P, S>,
    action: &Action,
    ctx: &ExecutionContext,
    opts: &ProvisionOptions,
    dirty: bool,
    reporter: &impl ProgressReporter,
) -> Result<Outcome>
where
    C: CommandRunner,
    F: HostFs,
    A: AccountManager,
    P: PackageInstaller,
    S: ServiceSupervisor,
{
    match action {
        Action::InstallPackages { packages } => {
            if packages.is_empty() {
                return Ok(Outcome::Unchanged);
            }
            host.packages.install(packages).await
        }
        Action::EnsureAccount { name, home } => host.accounts.ensure_account(name, home).await,
        Action::EnsureDir { path, mode } => {
            let created = host
                .fs
                .create_dir(path, *mode)
                .with_context(|| format!("creating {}", path.display()))?;
            host.fs.chown(path, &ctx.account)?;
            Ok(if created {
                Outcome::Changed
            } else {
                Outcome::Unchanged
            })
        }
        Action::WriteFile {
            path,
            contents,
            mode,
            owner,
        } => write_file(host.fs, path, contents, *mode, *owner, &ctx.account),
        Action::GitSync {
            repository,
            branch,
            dest,
        } => git_sync(host, ctx, repository, branch, dest).await,
        Action::Run {
            program,
            args,
            as_account,
            dir,
            creates,
        } => {
            if let Some(marker) = creates {
                if host.fs.exists(marker) {
                    reporter.detail(&format!("{} exists, skipping {program}", marker.display()));
                    return Ok(Outcome::Skipped);
                }
            }
            let (program, args) = command_line(ctx, *as_account, program, args);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let output = match dir {
                Some(dir) => {
                    host.runner
                        .run_in(dir, &program, &args, LONG_COMMAND_TIMEOUT)
                        .await?
                }
                None => {
                    host.runner
                        .run_with_timeout(&program, &args, LONG_COMMAND_TIMEOUT)
                        .await?
                }
            };
            ensure_success(&program, &output)?;
            Ok(Outcome::Changed)
        }
        Action::RegisterService(def) => {
            register_service(host.supervisor, def, opts, dirty, reporter).await
        }
    }
}

fn write_file(
    fs: &impl HostFs,
    path: &Path,
    contents: &str,
    mode: u32,
    owner: Owner,
    account: &str,
) -> Result<Outcome> {
    let current = fs
        .read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let outcome = if current.as_deref() == Some(contents) {
        fs.set_mode(path, mode)?;
        Outcome::Unchanged
    } else {
        fs.write(path, contents, mode)
            .with_context(|| format!("writing {}", path.display()))?;
        Outcome::Changed
    };
    if owner == Owner::Account {
        fs.chown(path, account)?;
    }
    Ok(outcome)
}

async fn git_sync<C, F, A, P, S>(
    host: &Host<'_, C, F, A, P, S>,
    ctx: &ExecutionContext,
    repository: &str,
    branch: &str,
    dest: &Path,
) -> Result<Outcome>
where
    C: CommandRunner,
    F: HostFs,
{
    let dest_str = dest.to_string_lossy().into_owned();
    let git_args: Vec<String> = if host.fs.exists(&dest.join(".git")) {
        ["-C", dest_str.as_str(), "pull", "--ff-only", "origin", branch]
            .map(str::to_string)
            .to_vec()
    } else {
        [
            "clone",
            "--branch",
            branch,
            "--single-branch",
            repository,
            dest_str.as_str(),
        ]
        .map(str::to_string)
        .to_vec()
    };
    let cloning = git_args[0] == "clone";
    let (program, args) = command_line(ctx, true, "git", &git_args);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = host
        .runner
        .run_with_timeout(&program, &args, LONG_COMMAND_TIMEOUT)
        .await?;
    ensure_success("git", &output)?;
    if cloning {
        return Ok(Outcome::Changed);
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(if stdout.contains("Already up to date") {
        Outcome::Unchanged
    } else {
        Outcome::Changed
    })
}

async fn register_service(
    supervisor: &impl ServiceSupervisor,
    def: &ServiceDefinition,
    opts: &ProvisionOptions,
    dirty: bool,
    reporter: &impl ProgressReporter,
) -> Result<Outcome> {
    let name = def.name.as_str();
    let registered = supervisor.register(def).await?;
    supervisor.enable(name).await?;

    let current = supervisor.state(name).await?;
    let outcome = if !current.is_running() {
        reporter.detail(&format!("starting {name}"));
        supervisor.start(name).await?;
        Outcome::Changed
    } else if registered == Outcome::Changed || dirty {
        reporter.detail(&format!("restarting {name}"));
        supervisor.restart(name).await?;
        Outcome::Changed
    } else {
        Outcome::Unchanged
    };

    reporter.detail(&format!("waiting for {name} to settle"));
    wait_running(supervisor, name, opts).await?;
    Ok(outcome)
}

/// Poll the supervisor until it reports the service active twice in a row.
///
/// # Errors
///
/// Returns [`ProvisionError::SupervisorStartFailed`] on a `failed` state or
/// when the settle window runs out.
pub async fn wait_running(
    supervisor: &impl ServiceSupervisor,
    name: &str,
    opts: &ProvisionOptions,
) -> Result<()> {
    let interval = opts.poll_interval.max(Duration::from_millis(1));
    let max_attempts =
        u32::try_from(opts.settle.as_millis() / interval.as_millis()).unwrap_or(u32::MAX);
    let max_attempts = max_attempts.max(REQUIRED_ACTIVE_POLLS);

    let mut consecutive = 0;
    let mut last = ServiceState::Unknown(String::new());
    for attempt in 1..=max_attempts {
        let state = supervisor.state(name).await?;
        tracing::debug!(service = name, attempt, %state, "supervisor poll");
        match state {
            ServiceState::Active => {
                consecutive += 1;
                if consecutive >= REQUIRED_ACTIVE_POLLS {
                    return Ok(());
                }
            }
            ServiceState::Failed => {
                return Err(ProvisionError::SupervisorStartFailed {
                    service: name.to_string(),
                    state: state.to_string(),
                }
                .into());
            }
            _ => consecutive = 0,
        }
        last = state;
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(ProvisionError::SupervisorStartFailed {
        service: name.to_string(),
        state: last.to_string(),
    }
    .into())
}

async fn verify_check<C, F, A, P, S>(host: &Host<'_, C, F, A, P, S>, check: &Check) -> Result<()>
where
    C: CommandRunner,
    F: HostFs,
    S: ServiceSupervisor,
{
    match check {
        Check::Always => Ok(()),
        Check::PathExists(path) => {
            anyhow::ensure!(
                host.fs.exists(path),
                "check failed: {} does not exist",
                path.display()
            );
            Ok(())
        }
        Check::CommandSucceeds { program, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let output = host.runner.run(program, &args).await?;
            anyhow::ensure!(
                output.status.success(),
                "check failed: {program} {} exited with {}",
                args.join(" "),
                output.status
            );
            Ok(())
        }
        Check::ServiceRunning(name) => {
            let state = host.supervisor.state(name).await?;
            anyhow::ensure!(
                state.is_running(),
                "check failed: {name} is {state}"
            );
            Ok(())
        }
    }
}

/// Wrap a command so it runs as the target account when asked.
fn command_line(
    ctx: &ExecutionContext,
    as_account: bool,
    program: &str,
    args: &[String],
) -> (String, Vec<String>) {
    if !as_account {
        return (program.to_string(), args.to_vec());
    }
    let mut wrapped = vec![
        "-u".to_string(),
        ctx.account.clone(),
        "--".to_string(),
        program.to_string(),
    ];
    wrapped.extend(args.iter().cloned());
    ("runuser".to_string(), wrapped)
}

fn ensure_success(program: &str, output: &Output) -> Result<()> {
    anyhow::ensure!(
        output.status.success(),
        "{program} exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    );
    Ok(())
}
