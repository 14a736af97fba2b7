//! Mutation and reproduction.
//!
//! A mutation picks one point in the token sequence. Function points are
//! replaced by a freshly grown subtree within the depth and length budget
//! the rest of the program leaves over; terminal points are resampled in
//! place, leaving the structure untouched.

use crate::gp::program::{
    GrowConfig, Program, Token, Variable, MAX_DEPTH, MAX_PROGRAM_LEN, NUM_CONSTANTS,
};
use crate::gp::traverse::{traverse, Mode};
use rand::Rng;

/// Worst-case length of a subtree the generator can emit without
/// expanding: a quaternary root with terminal operands.
const MIN_SUBTREE_LEN: usize = 5;

/// Outcome of one mutation.
#[derive(Debug, Clone)]
pub struct Mutation {
    /// The mutated offspring.
    pub offspring: Program,
    /// True when the length budget could not fit a fresh function subtree
    /// and the selected subtree collapsed to a single terminal instead.
    pub collapsed: bool,
}

/// Mutate one individual, producing one offspring.
///
/// The mutation point is drawn from `[1, len)`, so the root is never
/// mutated. A function point has its subtree regenerated with depth
/// budget `MAX_DEPTH - nesting` and length budget
/// `MAX_PROGRAM_LEN - 4 - (len - subtree_len)`; when that budget cannot
/// fit a minimal subtree the old subtree collapses to a single random
/// terminal, which still preserves every invariant. A terminal point is
/// replaced by a fresh terminal.
#[must_use]
pub fn mutate<R: Rng>(individual: &Program, grow: &GrowConfig, rng: &mut R) -> Mutation {
    let tokens = individual.tokens();
    let len = tokens.len();
    let point = rng.gen_range(1..len);

    if tokens[point].is_function() {
        let prefix = traverse(tokens, Mode::FromRoot, point);
        let old = traverse(tokens, Mode::FromPoint, point);
        let len_budget = (MAX_PROGRAM_LEN - 4).saturating_sub(len - old.len);
        let depth_budget = MAX_DEPTH.saturating_sub(prefix.depth);

        if len_budget < MIN_SUBTREE_LEN {
            let mut out = tokens.to_vec();
            out.splice(point..point + old.len, [random_terminal(rng)]);
            return Mutation {
                offspring: Program::from_tokens(out),
                collapsed: true,
            };
        }

        let subtree = Program::random(rng, depth_budget, len_budget, grow);
        let mut out = Vec::with_capacity(len - old.len + subtree.len());
        out.extend_from_slice(&tokens[..point]);
        out.extend_from_slice(subtree.tokens());
        out.extend_from_slice(&tokens[point + old.len..]);
        Mutation {
            offspring: Program::from_tokens(out),
            collapsed: false,
        }
    } else {
        let mut out = tokens.to_vec();
        out[point] = random_terminal(rng);
        Mutation {
            offspring: Program::from_tokens(out),
            collapsed: false,
        }
    }
}

/// Copy one individual unchanged into the next generation.
#[must_use]
pub fn reproduce(individual: &Program) -> Program {
    individual.clone()
}

/// Draw a terminal uniformly from the variables and constant indices.
fn random_terminal<R: Rng>(rng: &mut R) -> Token {
    match rng.gen_range(0..2 + NUM_CONSTANTS) {
        0 => Token::Var(Variable::X),
        1 => Token::Var(Variable::Y),
        pick => Token::Const(u8::try_from(pick - 2).unwrap_or(0)),
    }
}
