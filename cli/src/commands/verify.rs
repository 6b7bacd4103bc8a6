//! `outpost verify`: exercise the running service from outside.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::verify::{VerifyOptions, run_battery};
use crate::domain::config::{OutpostConfig, validate};
use crate::domain::exit;
use crate::infra::http::ReqwestProbe;

/// Arguments for the verify command.
#[derive(Args, Debug, Default)]
pub struct VerifyArgs {
    /// Host to probe (defaults to the service host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to probe (defaults to the service port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Concurrent requests in the load check (0 skips it)
    #[arg(long)]
    pub requests: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl VerifyArgs {
    fn apply(&self, cfg: &mut OutpostConfig) {
        if let Some(host) = &self.host {
            cfg.verify.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            cfg.verify.port = Some(port);
        }
        if let Some(requests) = self.requests {
            cfg.verify.requests = requests;
        }
        if let Some(timeout) = self.timeout {
            cfg.verify.timeout_secs = timeout;
        }
    }
}

/// Run the verify command. The report is printed whatever the verdict.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be built.
pub async fn run(app: &AppContext, args: &VerifyArgs) -> Result<ExitCode> {
    let mut cfg = app.config_store.load()?;
    args.apply(&mut cfg);
    validate(&cfg)?;

    let (host, port) = cfg.verify_target();
    let timeout = Duration::from_secs(cfg.verify.timeout_secs);
    let probe = ReqwestProbe::new(&host, port, timeout)?;
    let opts = VerifyOptions {
        timeout,
        requests: cfg.verify.requests,
    };

    let report = run_battery(&probe, &cfg.battery(), &opts, &app.reporter()).await;
    app.renderer().render_report(&report)?;
    Ok(ExitCode::from(exit::for_report(&report)))
}
