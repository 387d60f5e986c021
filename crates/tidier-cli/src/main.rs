mod bootstrap_helpers;
mod cli_args;
mod run_command;
mod schedule_command;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::{Cli, CliCommand};
use crate::run_command::execute_run_command;
use crate::schedule_command::execute_schedule_command;

fn run_cli(cli: Cli) -> Result<()> {
    match &cli.command {
        None | Some(CliCommand::Run) => execute_run_command(&cli.triage),
        Some(CliCommand::Schedule(schedule)) => execute_schedule_command(&cli.triage, schedule),
    }
}

fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("tidier: {error:#}");
            ExitCode::FAILURE
        }
    }
}
