//! Treegp CLI - evolve and inspect genetic-programming classifiers.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Treegp - a deterministic genetic-programming classifier for labeled
/// 2D points
#[derive(Parser, Debug)]
#[command(name = "treegp")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evolve a classifier against a dataset
    Run(cli::run::RunArgs),

    /// Parse a dataset file and report partition statistics
    Check(cli::check::CheckArgs),
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command {
        Commands::Run(run_args) => cli::run::execute(run_args),
        Commands::Check(check_args) => cli::check::execute(check_args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
