pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "geniebot",
    about = "Geniebot operator CLI",
    long_about = "Operate the Genie Slack bot: launch the bundled Python application, inspect \
                  configuration, check credential readiness, and discover the public tunnel URL.",
    after_help = "Examples:\n  geniebot launch\n  geniebot doctor --json\n  geniebot tunnel\n  geniebot config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Provision the Python virtual environment, install dependencies, and run the app"
    )]
    Launch,
    #[command(about = "Validate config, credential presence, and Slack token readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Discover the active ngrok tunnel and print the Slack event URL checklist")]
    Tunnel,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Launch => commands::launch::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Tunnel => commands::tunnel::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
