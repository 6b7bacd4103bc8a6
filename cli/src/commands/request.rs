//! `outpost request`: send one request to the service and show the reply.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Result, ensure};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{ConfigStore, HttpProbe};
use crate::application::services::verify::{json_body, send_request};
use crate::domain::exit;
use crate::domain::probe::{HttpMethod, HttpRequest};
use crate::infra::http::ReqwestProbe;
use crate::output::json::format_error;

/// Arguments for the request command.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, HEAD)
    pub method: HttpMethod,

    /// Request path, e.g. /messages/1
    pub path: String,

    /// JSON request body
    #[arg(long, short)]
    pub data: Option<String>,

    /// Host to contact (defaults to the verify target)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to contact (defaults to the verify target)
    #[arg(long)]
    pub port: Option<u16>,

    /// Timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Run the request command. Any HTTP status counts as a reply.
///
/// # Errors
///
/// Returns an error for a relative path, invalid `--data`, or an unusable
/// configuration. Transport failures exit with their own code instead.
pub async fn run(app: &AppContext, args: &RequestArgs) -> Result<ExitCode> {
    ensure!(
        args.path.starts_with('/'),
        "path must start with '/', got '{}'",
        args.path
    );
    let body = args.data.as_deref().map(json_body).transpose()?;

    let cfg = app.config_store.load()?;
    let (default_host, default_port) = cfg.verify_target();
    let host = args.host.clone().unwrap_or(default_host);
    let port = args.port.unwrap_or(default_port);
    let timeout = Duration::from_secs(args.timeout.unwrap_or(cfg.verify.timeout_secs));

    let probe = ReqwestProbe::new(&host, port, timeout)?;
    let request = HttpRequest {
        method: args.method,
        path: args.path.clone(),
        body,
    };

    match send_request(&probe, &request, timeout).await {
        Ok(exchange) => {
            app.renderer().render_exchange(&exchange)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let message = format!("{} {}{}: {err}", args.method, probe.base_url(), args.path);
            tracing::warn!(error = %err, "request failed");
            if app.is_json() {
                println!("{}", format_error(&message, "request_failed")?);
            } else {
                app.output.error(&message);
            }
            Ok(ExitCode::from(exit::REQUEST_FAILED))
        }
    }
}
