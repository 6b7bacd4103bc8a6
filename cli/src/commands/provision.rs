//! `outpost provision`: bring the host to the declared state.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::plan_builder::build_plan;
use crate::application::services::provision::{Host, ProvisionOptions, provision};
use crate::domain::config::{OutpostConfig, validate};
use crate::domain::plan::ExecutionContext;
use crate::domain::unit::{systemd_unit, unit_path};
use crate::infra::accounts::{SystemAccounts, is_elevated};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::fs::LocalFs;
use crate::infra::packages::AptInstaller;
use crate::infra::systemd::SystemdSupervisor;
use crate::output::HumanRenderer;

/// Arguments for the provision command.
#[derive(Args, Debug, Default)]
pub struct ProvisionArgs {
    /// Account that owns the install and runs the service
    #[arg(long)]
    pub account: Option<String>,

    /// Installation directory (absolute)
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Describe every action without changing the host
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl ProvisionArgs {
    /// Flag values win over the file.
    fn apply(&self, cfg: &mut OutpostConfig) {
        if let Some(account) = &self.account {
            cfg.service.account.clone_from(account);
        }
        if let Some(dir) = &self.install_dir {
            cfg.service.install_dir.clone_from(dir);
        }
    }
}

/// Run the provision command.
///
/// # Errors
///
/// Returns configuration errors and the first fatal [`ProvisionError`]
/// unchanged so `main` can map it to its exit code.
///
/// [`ProvisionError`]: crate::domain::error::ProvisionError
pub async fn run(app: &AppContext, args: &ProvisionArgs) -> Result<ExitCode> {
    let mut cfg = app.config_store.load()?;
    args.apply(&mut cfg);
    validate(&cfg)?;
    let plan = build_plan(&cfg)?;

    let ctx = ExecutionContext {
        account: cfg.service.account.clone(),
        install_dir: cfg.service.install_dir.clone(),
        elevated: is_elevated(),
        dry_run: args.dry_run,
    };
    tracing::info!(
        service = %cfg.service.name,
        steps = plan.len(),
        dry_run = ctx.dry_run,
        elevated = ctx.elevated,
        "provisioning"
    );

    if !app.is_json() {
        HumanRenderer::new(&app.output).render_service_overview(&cfg);
    }

    if !ctx.dry_run {
        let prompt = format!(
            "Provision {} on this host as '{}'?",
            cfg.service.name, cfg.service.account
        );
        if !app.confirm(&prompt, true)? {
            app.output.info("Aborted.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let runner = TokioCommandRunner::default();
    let fs = LocalFs;
    let accounts = SystemAccounts::new(&runner);
    let packages = AptInstaller::new(&runner);
    let supervisor = SystemdSupervisor::new(&runner);
    let host = Host {
        runner: &runner,
        fs: &fs,
        accounts: &accounts,
        packages: &packages,
        supervisor: &supervisor,
    };
    let opts = ProvisionOptions {
        settle: Duration::from_secs(cfg.service.settle_secs),
        ..ProvisionOptions::default()
    };

    let summary = provision(&host, &plan, &ctx, &opts, &app.reporter()).await?;

    if ctx.dry_run && !app.is_json() {
        let def = cfg.service_definition();
        let env = def.render_env().context("cannot render environment file")?;
        HumanRenderer::new(&app.output).render_artifacts(
            &unit_path(&def.name),
            &systemd_unit(&def),
            &def.env_file_path(),
            &env,
        );
    }

    app.renderer().render_provision_summary(&summary)?;
    Ok(ExitCode::SUCCESS)
}
