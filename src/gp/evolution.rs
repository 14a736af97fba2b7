//! Generation loop for the classification task.
//!
//! One [`RunState`] owns everything a run touches: the PRNG, the constant
//! pool, the dataset partitions, the population, and its fitness values.
//! Each generation the next population is built into a fresh buffer and
//! swapped in whole at the boundary, so no reader ever observes a
//! partially built generation. All PRNG consumption happens on the driver
//! thread; only the side-effect-free fitness backends run in parallel.

// The loop prints progress to stderr and uses intentional casts for
// rate arithmetic and statistics
#![allow(
    clippy::print_stderr,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use crate::dataset::{Case, Dataset};
use crate::error::EvalError;
use crate::gp::crossover::{crossover, CrossoverConfig};
use crate::gp::fitness::{BatchBackend, FitnessBackend, InterpreterBackend};
use crate::gp::interpreter::classify;
use crate::gp::mutation::{mutate, reproduce};
use crate::gp::program::{ConstantPool, GrowConfig, Program, MAX_DEPTH, MAX_PROGRAM_LEN};
use crate::gp::selection::{tournament, SelectionConfig};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Configuration for an evolution run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population size.
    pub population_size: usize,
    /// Total number of generations evaluated, including the initial one.
    pub generations: usize,
    /// PRNG seed; a fixed seed makes the whole run reproducible.
    pub seed: u64,
    /// Fraction of each new generation produced by crossover.
    pub crossover_rate: f64,
    /// Fraction produced by mutation.
    pub mutation_rate: f64,
    /// Fraction produced by reproduction.
    pub reproduction_rate: f64,
    /// Parent selection configuration.
    pub selection: SelectionConfig,
    /// Crossover retry budget.
    pub crossover: CrossoverConfig,
    /// Random growth probabilities.
    pub grow: GrowConfig,
    /// Cross-check the interpreter against the batch backend every
    /// generation.
    pub verify_backend: bool,
    /// Print per-generation progress to stderr.
    pub verbose: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 500,
            generations: 20,
            seed: 0,
            crossover_rate: 0.9,
            mutation_rate: 0.0,
            reproduction_rate: 0.1,
            selection: SelectionConfig::default(),
            crossover: CrossoverConfig::default(),
            grow: GrowConfig::default(),
            verify_backend: true,
            verbose: false,
        }
    }
}

/// Statistics for a single generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number; 0 is the initial population.
    pub generation: usize,
    /// Best training fitness.
    pub best_fitness: u32,
    /// Shortest program length among the best-fitness ties.
    pub best_len: usize,
    /// Mean training fitness.
    pub mean_fitness: f64,
    /// Crossovers that exhausted their retry budget and fell back to
    /// reproduction.
    pub crossover_fallbacks: usize,
    /// Mutations whose length budget forced a terminal collapse.
    pub mutation_collapses: usize,
    /// Remainder slots filled by extra reproductions after rate
    /// truncation.
    pub filler_offspring: usize,
}

/// Final report of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// The configuration the run used.
    pub config: EvolutionConfig,
    /// Per-generation statistics.
    pub generations: Vec<GenerationStats>,
    /// Best training fitness in the final generation.
    pub train_best_fitness: u32,
    /// Number of training cases.
    pub train_cases: usize,
    /// Test hits of the best test performer among the final generation's
    /// best-fitness ties.
    pub test_best_fitness: u32,
    /// Number of held-out test cases.
    pub test_cases: usize,
    /// Shortest program length among the test winners.
    pub test_best_len: usize,
    /// The winning program in prefix notation.
    pub best_program: String,
    /// Elapsed wall-clock seconds.
    pub elapsed_seconds: f64,
}

impl RunSummary {
    /// Test hit rate in percent, or zero without test cases.
    #[must_use]
    pub fn test_hit_rate(&self) -> f64 {
        if self.test_cases == 0 {
            0.0
        } else {
            f64::from(self.test_best_fitness) * 100.0 / self.test_cases as f64
        }
    }
}

/// Error during an evolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionError {
    /// A program failed structural evaluation.
    Eval(EvalError),
    /// The two fitness backends disagreed on an individual.
    BackendMismatch {
        /// Population index of the individual.
        index: usize,
        /// Count from the interpreter backend.
        interpreter: u32,
        /// Count from the batch backend.
        batch: u32,
    },
    /// The configuration cannot drive a run.
    InvalidConfig {
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The dataset has no training cases.
    EmptyTrainingSet,
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvolutionError::Eval(e) => write!(f, "evaluation fault: {e}"),
            EvolutionError::BackendMismatch {
                index,
                interpreter,
                batch,
            } => write!(
                f,
                "fitness backends disagree on individual {index}: \
                 interpreter counted {interpreter}, batch counted {batch}"
            ),
            EvolutionError::InvalidConfig { reason } => write!(f, "invalid config: {reason}"),
            EvolutionError::EmptyTrainingSet => write!(f, "dataset has no training cases"),
        }
    }
}

impl std::error::Error for EvolutionError {}

impl From<EvalError> for EvolutionError {
    fn from(e: EvalError) -> Self {
        Self::Eval(e)
    }
}

/// Offspring of one breeding pass, with its operator bookkeeping.
struct Brood {
    population: Vec<Program>,
    crossover_fallbacks: usize,
    mutation_collapses: usize,
    filler_offspring: usize,
}

/// Mutable state of one evolution run.
///
/// Constructed at run start, torn down at run end; nothing is global.
/// [`RunState::new`] scores the initial population, and every
/// [`RunState::advance`] breeds, swaps, and scores one more generation.
#[derive(Debug)]
pub struct RunState {
    config: EvolutionConfig,
    rng: SmallRng,
    constants: ConstantPool,
    train: Vec<Case>,
    test: Vec<Case>,
    population: Vec<Program>,
    fitness: Vec<u32>,
    generations: Vec<GenerationStats>,
    generation: usize,
    started: Instant,
}

impl RunState {
    /// Initialize a run: seed the PRNG, sample the constant pool,
    /// generate the initial population, and score it.
    ///
    /// # Errors
    ///
    /// Returns an error for an unusable configuration, an empty training
    /// partition, or a structural evaluation fault.
    pub fn new(config: EvolutionConfig, dataset: Dataset) -> Result<Self, EvolutionError> {
        if config.population_size == 0 {
            return Err(EvolutionError::InvalidConfig {
                reason: "population size must be positive",
            });
        }
        if config.generations == 0 {
            return Err(EvolutionError::InvalidConfig {
                reason: "at least one generation is required",
            });
        }
        if config.selection.tournament_size == 0 {
            return Err(EvolutionError::InvalidConfig {
                reason: "tournament size must be positive",
            });
        }
        if dataset.train.is_empty() {
            return Err(EvolutionError::EmptyTrainingSet);
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let constants = ConstantPool::random(&mut rng);
        let population: Vec<Program> = (0..config.population_size)
            .map(|_| Program::random(&mut rng, MAX_DEPTH, MAX_PROGRAM_LEN - 1, &config.grow))
            .collect();

        let mut state = Self {
            config,
            rng,
            constants,
            train: dataset.train,
            test: dataset.test,
            population,
            fitness: Vec::new(),
            generations: Vec::new(),
            generation: 0,
            started: Instant::now(),
        };
        state.score()?;
        state.record(0, 0, 0);
        Ok(state)
    }

    /// The configuration this run uses.
    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Statistics of the most recently scored generation.
    #[must_use]
    pub fn latest(&self) -> Option<&GenerationStats> {
        self.generations.last()
    }

    /// Run one generation: select parents, breed the next population,
    /// swap it in at the boundary, and score it.
    ///
    /// # Errors
    ///
    /// Returns an error on a structural evaluation fault or a backend
    /// mismatch.
    pub fn advance(&mut self) -> Result<GenerationStats, EvolutionError> {
        let brood = self.breed();
        self.population = brood.population;
        self.generation += 1;
        self.score()?;
        Ok(self.record(
            brood.crossover_fallbacks,
            brood.mutation_collapses,
            brood.filler_offspring,
        ))
    }

    /// Evaluate the final generation's best individuals on the held-out
    /// test partition and assemble the run summary.
    ///
    /// Every individual tied for the best training fitness is tested; the
    /// winner is the one with the most test hits, ties broken by the
    /// shorter program.
    ///
    /// # Errors
    ///
    /// Returns an error on a structural evaluation fault.
    pub fn into_summary(self) -> Result<RunSummary, EvolutionError> {
        let train_best = self.fitness.iter().copied().max().unwrap_or(0);

        let mut test_best = 0u32;
        let mut test_best_len = MAX_PROGRAM_LEN;
        let mut winner: Option<usize> = None;
        for (index, &fit) in self.fitness.iter().enumerate() {
            if fit != train_best {
                continue;
            }
            let program = &self.population[index];
            let mut hits = 0u32;
            for case in &self.test {
                if classify(program.tokens(), case.x, case.y, &self.constants)? == case.label {
                    hits += 1;
                }
            }
            if hits > test_best || (hits == test_best && program.len() < test_best_len) {
                test_best = hits;
                test_best_len = program.len();
                winner = Some(index);
            }
        }

        let best_program = winner
            .map(|index| self.population[index].to_string())
            .unwrap_or_default();

        Ok(RunSummary {
            generations: self.generations,
            train_best_fitness: train_best,
            train_cases: self.train.len(),
            test_best_fitness: test_best,
            test_cases: self.test.len(),
            test_best_len,
            best_program,
            elapsed_seconds: self.started.elapsed().as_secs_f64(),
            config: self.config,
        })
    }

    /// Score the current population, cross-checking backends when
    /// configured.
    fn score(&mut self) -> Result<(), EvolutionError> {
        let fitness = self.run_backend(&InterpreterBackend)?;
        if self.config.verify_backend {
            let batch = self.run_backend(&BatchBackend)?;
            for (index, (&a, &b)) in fitness.iter().zip(&batch).enumerate() {
                if a != b {
                    return Err(EvolutionError::BackendMismatch {
                        index,
                        interpreter: a,
                        batch: b,
                    });
                }
            }
        }
        self.fitness = fitness;
        Ok(())
    }

    fn run_backend(&self, backend: &dyn FitnessBackend) -> Result<Vec<u32>, EvolutionError> {
        let started = Instant::now();
        let counts = backend.evaluate(&self.population, &self.train, &self.constants)?;
        if self.config.verbose {
            eprintln!(
                "gen {:>3}: {} eval took {:.1} ms",
                self.generation,
                backend.name(),
                started.elapsed().as_secs_f64() * 1e3
            );
        }
        Ok(counts)
    }

    /// Breed the next population from the current one.
    fn breed(&mut self) -> Brood {
        let pop_size = self.config.population_size;
        let k = self.config.selection.tournament_size;
        let n_crossover = (pop_size as f64 * self.config.crossover_rate) as usize;
        let n_mutation = (pop_size as f64 * self.config.mutation_rate) as usize;
        let n_reproduction = (pop_size as f64 * self.config.reproduction_rate) as usize;

        let mut next = Vec::with_capacity(pop_size);
        let mut crossover_fallbacks = 0;
        let mut mutation_collapses = 0;

        for _ in 0..n_crossover {
            let i1 = tournament(&self.fitness, k, &mut self.rng);
            let i2 = tournament(&self.fitness, k, &mut self.rng);
            match crossover(
                &self.population[i1],
                &self.population[i2],
                self.config.crossover,
                &mut self.rng,
            ) {
                Some(child) => next.push(child),
                None => {
                    crossover_fallbacks += 1;
                    next.push(reproduce(&self.population[i1]));
                }
            }
        }

        for _ in 0..n_mutation {
            let index = tournament(&self.fitness, k, &mut self.rng);
            let mutation = mutate(&self.population[index], &self.config.grow, &mut self.rng);
            if mutation.collapsed {
                mutation_collapses += 1;
            }
            next.push(mutation.offspring);
        }

        for _ in 0..n_reproduction {
            let index = tournament(&self.fitness, k, &mut self.rng);
            next.push(reproduce(&self.population[index]));
        }

        // Rate truncation can leave the population short; extra
        // reproductions fill the remainder so no slot stays undefined.
        let mut filler_offspring = 0;
        while next.len() < pop_size {
            filler_offspring += 1;
            let index = tournament(&self.fitness, k, &mut self.rng);
            next.push(reproduce(&self.population[index]));
        }
        next.truncate(pop_size);

        Brood {
            population: next,
            crossover_fallbacks,
            mutation_collapses,
            filler_offspring,
        }
    }

    /// Record and optionally print the statistics of the generation just
    /// scored.
    fn record(
        &mut self,
        crossover_fallbacks: usize,
        mutation_collapses: usize,
        filler_offspring: usize,
    ) -> GenerationStats {
        let mut best_fitness = 0u32;
        let mut best_len = MAX_PROGRAM_LEN;
        for (index, &fit) in self.fitness.iter().enumerate() {
            let len = self.population[index].len();
            if fit > best_fitness {
                best_fitness = fit;
                best_len = len;
            } else if fit == best_fitness && len < best_len {
                best_len = len;
            }
        }
        let mean_fitness =
            self.fitness.iter().map(|&f| f64::from(f)).sum::<f64>() / self.fitness.len() as f64;

        let stats = GenerationStats {
            generation: self.generation,
            best_fitness,
            best_len,
            mean_fitness,
            crossover_fallbacks,
            mutation_collapses,
            filler_offspring,
        };
        self.generations.push(stats);

        if self.config.verbose {
            eprintln!(
                "gen {:>3}: best={:>3} len={:>3} mean={:6.2}",
                stats.generation, stats.best_fitness, stats.best_len, stats.mean_fitness
            );
        }

        stats
    }
}

/// Drive a complete run: initialize, advance through every generation,
/// and produce the final summary.
///
/// # Errors
///
/// Propagates configuration, evaluation, and backend-mismatch errors.
pub fn evolve(config: EvolutionConfig, dataset: Dataset) -> Result<RunSummary, EvolutionError> {
    let generations = config.generations;
    let mut state = RunState::new(config, dataset)?;
    for _ in 1..generations {
        state.advance()?;
    }
    state.into_summary()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blob_dataset() -> Dataset {
        // Class 1 clusters around (0.5, 0.5), class 0 around (-0.5, -0.5).
        let mut cases = Vec::new();
        for i in 0i16..48 {
            let jitter = f32::from(i % 7) * 0.03;
            let label = i % 2 == 0;
            let center = if label { 0.5 } else { -0.5 };
            cases.push(Case {
                x: center + jitter,
                y: center - jitter,
                label,
            });
        }
        let train = cases.split_off(16);
        Dataset { test: cases, train }
    }

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 40,
            generations: 4,
            seed: 11,
            ..EvolutionConfig::default()
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = EvolutionConfig::default();
        assert_eq!(config.population_size, 500);
        assert_eq!(config.generations, 20);
        assert!(config.verify_backend);
        let rates = config.crossover_rate + config.mutation_rate + config.reproduction_rate;
        assert!((rates - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_is_reproducible() {
        let first = evolve(small_config(), two_blob_dataset()).unwrap();
        let second = evolve(small_config(), two_blob_dataset()).unwrap();

        assert_eq!(first.generations, second.generations);
        assert_eq!(first.train_best_fitness, second.train_best_fitness);
        assert_eq!(first.test_best_fitness, second.test_best_fitness);
        assert_eq!(first.test_best_len, second.test_best_len);
        assert_eq!(first.best_program, second.best_program);
    }

    #[test]
    fn test_generation_count_and_summary_bounds() {
        let summary = evolve(small_config(), two_blob_dataset()).unwrap();

        assert_eq!(summary.generations.len(), 4);
        assert_eq!(summary.train_cases, 32);
        assert_eq!(summary.test_cases, 16);
        assert!(summary.train_best_fitness <= 32);
        assert!(summary.test_best_fitness <= 16);
        assert!(!summary.best_program.is_empty());
        for stats in &summary.generations {
            assert!(stats.best_len <= MAX_PROGRAM_LEN - 1);
        }
    }

    #[test]
    fn test_truncation_remainder_is_filled() {
        let config = EvolutionConfig {
            population_size: 8,
            generations: 2,
            crossover_rate: 0.5,
            mutation_rate: 0.0,
            reproduction_rate: 0.25,
            seed: 3,
            ..EvolutionConfig::default()
        };
        let mut state = RunState::new(config, two_blob_dataset()).unwrap();
        let stats = state.advance().unwrap();

        // floor(8 * 0.5) + floor(8 * 0.25) = 6 offspring; two filled.
        assert_eq!(stats.filler_offspring, 2);
        assert_eq!(state.latest(), Some(&stats));
    }

    #[test]
    fn test_mutation_only_run() {
        let config = EvolutionConfig {
            population_size: 20,
            generations: 3,
            crossover_rate: 0.0,
            mutation_rate: 0.9,
            reproduction_rate: 0.1,
            seed: 5,
            ..EvolutionConfig::default()
        };
        let summary = evolve(config, two_blob_dataset()).unwrap();
        assert_eq!(summary.generations.len(), 3);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EvolutionConfig {
            population_size: 0,
            ..EvolutionConfig::default()
        };
        assert!(matches!(
            RunState::new(config, two_blob_dataset()),
            Err(EvolutionError::InvalidConfig { .. })
        ));

        let config = EvolutionConfig {
            generations: 0,
            ..EvolutionConfig::default()
        };
        assert!(matches!(
            RunState::new(config, two_blob_dataset()),
            Err(EvolutionError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let dataset = Dataset {
            test: vec![Case {
                x: 0.0,
                y: 0.0,
                label: true,
            }],
            train: Vec::new(),
        };
        assert!(matches!(
            RunState::new(EvolutionConfig::default(), dataset),
            Err(EvolutionError::EmptyTrainingSet)
        ));
    }
}
