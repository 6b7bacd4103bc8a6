//! Builds the provisioning plan from configuration.
//!
//! Pure: no ports are touched. The env file and the service registration
//! both come from the single `ServiceDefinition` the config produces.

use anyhow::{Context, Result};
use outpost_common::service::env_file_path;

use crate::domain::config::OutpostConfig;
use crate::domain::plan::{Action, Check, Owner, Plan, Step};

/// Mode of the install directory.
pub const INSTALL_DIR_MODE: u32 = 0o755;
/// Mode of the env file: readable by the account, not by others.
pub const ENV_FILE_MODE: u32 = 0o640;

/// Build the ordered step list for a configuration.
///
/// # Errors
///
/// Returns an error if the environment cannot be rendered (invalid key or
/// multi-line value).
pub fn build_plan(cfg: &OutpostConfig) -> Result<Plan> {
    let svc = &cfg.service;
    let def = cfg.service_definition();
    let mut steps = Vec::new();

    steps.push(Step::new("packages").action(Action::InstallPackages {
        packages: cfg.packages.clone(),
    }));

    steps.push(
        Step::new("account")
            .action(Action::EnsureAccount {
                name: svc.account.clone(),
                home: svc.install_dir.clone(),
            })
            .check(Check::CommandSucceeds {
                program: "id".to_string(),
                args: vec!["-u".to_string(), svc.account.clone()],
            }),
    );

    steps.push(
        Step::new("install-dir")
            .action(Action::EnsureDir {
                path: svc.install_dir.clone(),
                mode: INSTALL_DIR_MODE,
            })
            .check(Check::PathExists(svc.install_dir.clone())),
    );

    if let (Some(repository), Some(dest)) = (&svc.repository, cfg.checkout_dir()) {
        steps.push(
            Step::new("source")
                .action(Action::GitSync {
                    repository: repository.clone(),
                    branch: svc.branch.clone(),
                    dest: dest.clone(),
                })
                .check(Check::PathExists(dest.join(".git"))),
        );
    }

    if !cfg.setup.is_empty() {
        let working_dir = cfg.working_dir();
        let mut step = Step::new("setup");
        for entry in &cfg.setup {
            let Some((program, args)) = entry.command.split_first() else {
                continue;
            };
            step = step.action(Action::Run {
                program: program.clone(),
                args: args.to_vec(),
                as_account: true,
                dir: Some(working_dir.clone()),
                creates: entry.creates.as_ref().map(|p| working_dir.join(p)),
            });
        }
        // Setup commands are only idempotent when every one is guarded.
        let guarded = cfg.setup.iter().all(|e| e.creates.is_some());
        steps.push(step.idempotent(guarded));
    }

    let env_path = env_file_path(&svc.install_dir);
    let env_contents = def
        .render_env()
        .context("cannot render the service environment")?;
    steps.push(
        Step::new("environment")
            .action(Action::WriteFile {
                path: env_path.clone(),
                contents: env_contents,
                mode: ENV_FILE_MODE,
                owner: Owner::Account,
            })
            .check(Check::PathExists(env_path)),
    );

    steps.push(
        Step::new("service")
            .action(Action::RegisterService(Box::new(def)))
            .check(Check::ServiceRunning(svc.name.clone())),
    );

    Ok(Plan::new(steps))
}
