//! Subtree crossover.
//!
//! Crossover splices a subtree of one parent into a cut point of the
//! other, entirely by slicing the flat token sequences. Cut points are
//! resampled until the offspring satisfies the depth and length
//! invariants, up to a configured retry budget.

use crate::gp::program::{Program, MAX_DEPTH, MAX_PROGRAM_LEN};
use crate::gp::traverse::{traverse, Mode};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for crossover.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CrossoverConfig {
    /// Maximum cut-point resamples before giving up on a parent pair.
    pub max_retries: usize,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self { max_retries: 50 }
    }
}

/// Cross two parents, producing one offspring.
///
/// Samples a cut in `parent1` (never index 0, so its root survives) and a
/// donor subtree root in `parent2`; a candidate pair is rejected while the
/// combined nesting depth would exceed [`MAX_DEPTH`] or the spliced
/// length would exceed [`MAX_PROGRAM_LEN`]` - 4`. Returns `None` when no
/// feasible pair was found within `config.max_retries` attempts; the
/// caller chooses the fallback.
#[must_use]
pub fn crossover<R: Rng>(
    parent1: &Program,
    parent2: &Program,
    config: CrossoverConfig,
    rng: &mut R,
) -> Option<Program> {
    let tokens1 = parent1.tokens();
    let tokens2 = parent2.tokens();
    let len1 = tokens1.len();
    let len2 = tokens2.len();

    for _ in 0..config.max_retries {
        let cut1 = rng.gen_range(1..len1);
        let cut2 = rng.gen_range(0..len2);

        let prefix = traverse(tokens1, Mode::FromRoot, cut1);
        let removed = traverse(tokens1, Mode::FromPoint, cut1);
        let donor = traverse(tokens2, Mode::FromPoint, cut2);

        if prefix.depth + donor.depth > MAX_DEPTH
            || len1 - removed.len + donor.len > MAX_PROGRAM_LEN - 4
        {
            continue;
        }

        let mut tokens = Vec::with_capacity(len1 - removed.len + donor.len);
        tokens.extend_from_slice(&tokens1[..cut1]);
        tokens.extend_from_slice(&tokens2[cut2..cut2 + donor.len]);
        tokens.extend_from_slice(&tokens1[cut1 + removed.len..]);
        return Some(Program::from_tokens(tokens));
    }

    None
}
