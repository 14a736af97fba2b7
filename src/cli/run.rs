//! The `run` command: evolve a classifier and report the result.

// Progress-bar positions use an intentional widening cast
#![allow(clippy::cast_possible_truncation)]

use crate::cli::{output, CliError, OutputFormat};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use treegp::dataset::Dataset;
use treegp::gp::{EvolutionConfig, RunState};

/// Arguments for the `run` command.
#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// Dataset file of whitespace-delimited `x y label` records
    #[arg(required = true)]
    dataset: PathBuf,

    /// Random seed
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Number of generations
    #[arg(short, long, default_value = "20")]
    generations: usize,

    /// Population size
    #[arg(short, long, default_value = "500")]
    population: usize,

    /// Leading records reserved for the held-out test partition
    #[arg(long, default_value = "62")]
    test_size: usize,

    /// Skip the batch-backend cross-check
    #[arg(long)]
    no_verify: bool,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write the rendered report to a file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Print per-generation progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Execute the run command.
pub(crate) fn execute(args: RunArgs) -> Result<(), CliError> {
    let dataset = Dataset::load(&args.dataset, args.test_size)?;

    let config = EvolutionConfig {
        population_size: args.population,
        generations: args.generations,
        seed: args.seed,
        verify_backend: !args.no_verify,
        verbose: args.verbose,
        ..EvolutionConfig::default()
    };

    let generations = config.generations;
    let mut state = RunState::new(config, dataset)?;

    let pb = if args.progress {
        let pb = ProgressBar::new(generations as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {pos}/{len} generations {msg}",
                )
                .expect("valid template")
                .progress_chars("=>-"),
        );
        // The initial population is already scored by RunState::new.
        pb.inc(1);
        Some(pb)
    } else {
        None
    };

    for _ in 1..generations {
        let stats = state.advance()?;
        if let Some(pb) = &pb {
            pb.inc(1);
            pb.set_message(format!("best {}", stats.best_fitness));
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let summary = state.into_summary()?;
    let rendered = match args.format {
        OutputFormat::Text => output::format_text(&summary),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?,
    };
    println!("{rendered}");

    if let Some(path) = args.save {
        fs::write(&path, format!("{rendered}\n"))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
