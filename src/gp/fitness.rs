//! Fitness evaluation backends.
//!
//! Fitness is the number of training cases a program classifies
//! correctly. Two backends share one contract: the reference backend
//! interprets the token sequence case by case, while the batch backend
//! consumes the flattened population buffer with per-program occupied
//! lengths and yields raw per-(program, case) margins the way an
//! accelerated kernel does, converted to counts with the same match
//! rule. The evolution driver can run both and diff the counts per
//! individual as a cross-validation check.

// Match counts are bounded by the case count, far below u32::MAX
#![allow(clippy::cast_possible_truncation)]

use crate::dataset::Case;
use crate::error::EvalResult;
use crate::gp::interpreter::{classify, evaluate_flat};
use crate::gp::program::{ConstantPool, Program, MAX_PROGRAM_LEN, NUM_CONSTANTS};
use rayon::prelude::*;

/// A fitness evaluation strategy over a whole population.
///
/// Implementations must be side-effect-free and return counts in
/// population order, so backends are interchangeable and comparable.
pub trait FitnessBackend {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Count correctly classified cases for every program.
    ///
    /// # Errors
    ///
    /// Returns an error when any program is structurally malformed.
    fn evaluate(
        &self,
        population: &[Program],
        cases: &[Case],
        constants: &ConstantPool,
    ) -> EvalResult<Vec<u32>>;
}

/// Reference backend: per-case token interpretation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterBackend;

impl FitnessBackend for InterpreterBackend {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn evaluate(
        &self,
        population: &[Program],
        cases: &[Case],
        constants: &ConstantPool,
    ) -> EvalResult<Vec<u32>> {
        population
            .par_iter()
            .map(|program| {
                let mut hits = 0u32;
                for case in cases {
                    if classify(program.tokens(), case.x, case.y, constants)? == case.label {
                        hits += 1;
                    }
                }
                Ok(hits)
            })
            .collect()
    }
}

/// Accelerated-contract backend.
///
/// Flattens the population into one contiguous byte buffer with
/// per-program occupied lengths and produces a signed raw margin for
/// every (program, case) pair — exactly the interface an offloaded
/// kernel fulfills. Margins become fitness counts through
/// [`count_matches`], the identical rule the reference backend applies
/// to its classifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchBackend;

/// Raw margins for every (program, case) pair, program-major: the batch
/// half of the accelerated contract.
///
/// # Errors
///
/// Returns an error when any program row is malformed.
pub fn raw_margins(
    population: &[Program],
    cases: &[Case],
    constants: &ConstantPool,
) -> EvalResult<Vec<f32>> {
    let flat = flatten_population(population);
    let lengths: Vec<usize> = population.iter().map(Program::len).collect();

    let rows = (0..population.len())
        .into_par_iter()
        .map(|i| {
            let row = &flat[i * MAX_PROGRAM_LEN..(i + 1) * MAX_PROGRAM_LEN][..lengths[i]];
            let mut vals = [0.0f32; 2 + NUM_CONSTANTS];
            vals[2..].copy_from_slice(constants.as_slice());

            let mut margins = Vec::with_capacity(cases.len());
            for case in cases {
                vals[0] = case.x;
                vals[1] = case.y;
                margins.push(evaluate_flat(row, &vals)?);
            }
            Ok(margins)
        })
        .collect::<EvalResult<Vec<Vec<f32>>>>()?;

    Ok(rows.concat())
}

impl FitnessBackend for BatchBackend {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn evaluate(
        &self,
        population: &[Program],
        cases: &[Case],
        constants: &ConstantPool,
    ) -> EvalResult<Vec<u32>> {
        if cases.is_empty() {
            return Ok(vec![0; population.len()]);
        }
        let margins = raw_margins(population, cases, constants)?;
        Ok(margins
            .chunks(cases.len())
            .map(|row| count_matches(row, cases))
            .collect())
    }
}

/// Convert one program's raw margins into its fitness count.
///
/// The shared match rule: a positive margin predicts class `true`, and a
/// prediction that equals the label scores one hit.
#[must_use]
pub fn count_matches(margins: &[f32], cases: &[Case]) -> u32 {
    margins
        .iter()
        .zip(cases)
        .filter(|(&margin, case)| (margin > 0.0) == case.label)
        .count() as u32
}

/// Flatten a population into contiguous sentinel-padded rows of
/// [`MAX_PROGRAM_LEN`] bytes each, the layout the batch backend and any
/// accelerated kernel consume.
#[must_use]
pub fn flatten_population(population: &[Program]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(population.len() * MAX_PROGRAM_LEN);
    for program in population {
        buf.extend_from_slice(&program.encode());
    }
    buf
}
