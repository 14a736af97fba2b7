//! Genetic programming over flat preorder expression programs.
//!
//! This module provides the complete evolutionary core: programs are
//! expression trees serialized as flat token sequences with fixed opcode
//! arities, so structure is recovered by stack simulation instead of
//! pointers, and every genetic operator is a slice-and-splice over the
//! sequence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │          Generation Loop            │
//! ├─────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation   │
//! ├─────────────────────────────────────┤
//! │   Fitness Backends (interpreter,    │
//! │        batch cross-check)           │
//! ├─────────────────────────────────────┤
//! │   Traversal │ Flat token programs   │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use treegp::dataset::Dataset;
//! use treegp::gp::{evolve, EvolutionConfig};
//!
//! let dataset = Dataset::load(path, 62)?;
//! let summary = evolve(EvolutionConfig::default(), dataset)?;
//! println!("{}", summary.test_hit_rate());
//! ```

mod crossover;
mod evolution;
mod fitness;
mod interpreter;
mod mutation;
mod program;
mod selection;
mod traverse;

pub use crossover::{crossover, CrossoverConfig};
pub use evolution::{
    evolve, EvolutionConfig, EvolutionError, GenerationStats, RunState, RunSummary,
};
pub use fitness::{
    count_matches, flatten_population, raw_margins, BatchBackend, FitnessBackend,
    InterpreterBackend,
};
pub use interpreter::{classify, evaluate, evaluate_flat, DIV_GUARD};
pub use mutation::{mutate, reproduce, Mutation};
pub use program::{
    ConstantPool, GrowConfig, Opcode, Program, Token, Variable, CONSTANT_MAX, CONSTANT_MIN,
    MAX_DEPTH, MAX_PROGRAM_LEN, NUM_CONSTANTS,
};
pub use selection::{tournament, SelectionConfig};
pub use traverse::{traverse, Mode, Traversal};
