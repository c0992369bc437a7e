pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "agromaq",
    about = "Agromaq quotation system operator CLI",
    long_about = "Operate the Agromaq machine catalog: migrations, seeding, deactivation, config inspection, and readiness checks.",
    after_help = "Examples:\n  agromaq migrate\n  agromaq seed\n  agromaq deactivate ACO001\n  agromaq doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the built-in machine catalog when the machine table is empty")]
    Seed,
    #[command(about = "Hide a machine from listings and quotations without deleting its history")]
    Deactivate {
        #[arg(help = "Machine code, e.g. ACO001")]
        code: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, admin credentials, PDF converter, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Deactivate { code } => commands::deactivate::run(&code),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
