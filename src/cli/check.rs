//! The `check` command: inspect a dataset file before a long run.

// Argument structs are consumed whole for uniformity with `run`
#![allow(clippy::needless_pass_by_value)]

use crate::cli::CliError;
use clap::Args;
use std::path::PathBuf;
use treegp::dataset::{Case, Dataset};

/// Arguments for the `check` command.
#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    /// Dataset file to inspect
    #[arg(required = true)]
    dataset: PathBuf,

    /// Leading records reserved for the held-out test partition
    #[arg(long, default_value = "62")]
    test_size: usize,
}

/// Execute the check command.
pub(crate) fn execute(args: CheckArgs) -> Result<(), CliError> {
    let dataset = Dataset::load(&args.dataset, args.test_size)?;

    println!("{}", args.dataset.display());
    println!(
        "  records: {}",
        dataset.test.len() + dataset.train.len()
    );
    println!(
        "  test:    {:>4} cases, {} labeled 1",
        dataset.test.len(),
        positives(&dataset.test)
    );
    println!(
        "  train:   {:>4} cases, {} labeled 1",
        dataset.train.len(),
        positives(&dataset.train)
    );

    Ok(())
}

fn positives(cases: &[Case]) -> usize {
    cases.iter().filter(|case| case.label).count()
}
