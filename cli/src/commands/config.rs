//! `outpost config`: show the effective configuration.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::output::HumanRenderer;

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration (file merged over defaults)
    Show,
    /// Print the configuration file path
    Path,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn run(app: &AppContext, cmd: &ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => show_config(app),
        ConfigCommand::Path => show_path(app),
    }
}

fn show_config(app: &AppContext) -> Result<ExitCode> {
    let config = app.config_store.load()?;
    let path = app.config_store.path()?;
    app.renderer().render_config(&config, &path)?;
    Ok(ExitCode::SUCCESS)
}

fn show_path(app: &AppContext) -> Result<ExitCode> {
    let path = app.config_store.path()?;
    if app.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "path": path.display().to_string(),
                "exists": path.exists(),
            }))?
        );
    } else {
        HumanRenderer::new(&app.output).render_config_path(&path);
    }
    Ok(ExitCode::SUCCESS)
}
