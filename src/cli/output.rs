//! Report rendering for the `run` command.

use std::fmt::Write as _;
use treegp::gp::RunSummary;

/// Render a run summary as human-readable text.
pub(crate) fn format_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    let config = &summary.config;

    let _ = writeln!(out, "==== configuration ====");
    let _ = writeln!(
        out,
        "population = {}, generations = {}, seed = {}",
        config.population_size, config.generations, config.seed
    );
    let _ = writeln!(
        out,
        "crossover = {:.2}, mutation = {:.2}, reproduction = {:.2}",
        config.crossover_rate, config.mutation_rate, config.reproduction_rate
    );
    let _ = writeln!(
        out,
        "func prob = {:.2}, var prob = {:.2}, tournament size = {}, \
         crossover retries = {}",
        config.grow.func_prob,
        config.grow.var_prob,
        config.selection.tournament_size,
        config.crossover.max_retries
    );
    let _ = writeln!(
        out,
        "backend cross-check = {}",
        if config.verify_backend { "on" } else { "off" }
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "==== generations ====");
    for stats in &summary.generations {
        let _ = write!(
            out,
            "gen {:>3}: best={:>3} len={:>3} mean={:6.2}",
            stats.generation, stats.best_fitness, stats.best_len, stats.mean_fitness
        );
        if stats.crossover_fallbacks > 0 {
            let _ = write!(out, " crossover_fallbacks={}", stats.crossover_fallbacks);
        }
        if stats.mutation_collapses > 0 {
            let _ = write!(out, " mutation_collapses={}", stats.mutation_collapses);
        }
        if stats.filler_offspring > 0 {
            let _ = write!(out, " filled={}", stats.filler_offspring);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "==== result ====");
    let _ = writeln!(
        out,
        "training best fitness = {} / {}",
        summary.train_best_fitness, summary.train_cases
    );
    let _ = writeln!(
        out,
        "test best fitness     = {} / {} ({:.1}%)",
        summary.test_best_fitness,
        summary.test_cases,
        summary.test_hit_rate()
    );
    let _ = writeln!(out, "test best length      = {}", summary.test_best_len);
    let _ = writeln!(out, "best program          = {}", summary.best_program);
    let _ = write!(out, "elapsed               = {:.2}s", summary.elapsed_seconds);

    out
}
