//! Outpost CLI - provision a service onto a host and verify it from outside

use std::process::ExitCode;

use clap::Parser;

use outpost_cli::cli::Cli;
use outpost_cli::domain::error::ProvisionError;
use outpost_cli::domain::exit;
use outpost_cli::infra::logging::init_tracing;
use outpost_cli::output::json::format_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;
    init_tracing(cli.verbose, !cli.no_color);

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let code = e
                .downcast_ref::<ProvisionError>()
                .map_or(exit::GENERIC_FAILURE, exit::for_provision_error);
            if json {
                let kind = if code == exit::GENERIC_FAILURE {
                    "error"
                } else {
                    "provision_failed"
                };
                match format_error(&format!("{e:#}"), kind) {
                    Ok(doc) => println!("{doc}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(code)
        }
    }
}
