//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Provision a service onto a host and verify it from outside
#[derive(Parser)]
#[command(
    name = "outpost",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file
    #[arg(short, long, global = true, env = "OUTPOST_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install and start the service on this host
    Provision(commands::provision::ProvisionArgs),

    /// Check the running service against its HTTP contract
    Verify(commands::verify::VerifyArgs),

    /// Send a single request to the service
    Request(commands::request::RequestArgs),

    /// Show the supervisor state of the service
    Status,

    /// Inspect configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails. Outcomes with a dedicated exit
    /// code come back as `Ok`.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose: _,
            config,
            command,
        } = self;

        let yes = matches!(&command, Command::Provision(args) if args.yes);
        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes, config },
        });

        match command {
            Command::Provision(args) => commands::provision::run(&app, &args).await,
            Command::Verify(args) => commands::verify::run(&app, &args).await,
            Command::Request(args) => commands::request::run(&app, &args).await,
            Command::Status => commands::status::run(&app).await,
            Command::Config(cmd) => commands::config::run(&app, &cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
