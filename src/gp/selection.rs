//! Tournament selection.
//!
//! Parents are chosen by drawing a small number of contestants uniformly
//! at random (with replacement) and keeping the fittest. Ties are
//! deterministic: the earliest-drawn contestant wins.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for parent selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Number of contestants per tournament.
    pub tournament_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { tournament_size: 2 }
    }
}

/// Tournament selection over precomputed fitness values.
///
/// Draws `k` indices uniformly with replacement. The first draw is the
/// incumbent; a later draw replaces it only on strictly greater fitness,
/// so equal-fitness contests always keep the earliest draw. Never mutates
/// the population or its fitness.
///
/// # Panics
///
/// Panics if `fitness` is empty or `k` is zero.
#[must_use]
pub fn tournament<R: Rng>(fitness: &[u32], k: usize, rng: &mut R) -> usize {
    assert!(k > 0, "tournament needs at least one contestant");
    let mut best = rng.gen_range(0..fitness.len());
    for _ in 1..k {
        let contender = rng.gen_range(0..fitness.len());
        if fitness[contender] > fitness[best] {
            best = contender;
        }
    }
    best
}
