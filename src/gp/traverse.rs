//! Structural traversal over flat token sequences.
//!
//! Subtree boundaries are never stored; they are re-derived on demand by
//! replaying the generator's slot/delimiter stack against the fixed opcode
//! arities, consuming exactly one token per step. Cost is linear in the
//! tokens visited and the only allocation is the slot stack itself.

use crate::gp::program::Token;

/// What a traversal measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Scan from the program start and stop at `point`, yielding the
    /// prefix length and the nesting depth at `point`.
    FromRoot,
    /// Scan the subtree rooted at `point`, yielding its token length and
    /// maximum depth.
    FromPoint,
}

/// Result of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traversal {
    /// Token count covered by the traversal.
    pub len: usize,
    /// Tree depth (nesting depth for [`Mode::FromRoot`], maximum subtree
    /// depth for [`Mode::FromPoint`]).
    pub depth: usize,
}

/// Slot-stack entry. A delimiter marks where a function's operand group
/// ends; the entries above it are that function's unfilled operand slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Closes a function's operand group.
    Delim,
    /// One pending operand.
    Arg,
}

/// Measure a prefix or a subtree of `tokens` by stack simulation.
///
/// For [`Mode::FromRoot`] the scan starts at index 0 and `point` is the
/// index to stop at; for [`Mode::FromPoint`] the scan starts at `point`
/// and stops when the subtree rooted there is fully consumed. A terminal
/// start token is its own subtree of length one and depth one.
///
/// # Panics
///
/// Panics if `point` is out of range or the sequence is not a well-formed
/// preorder serialization (the scan would run off the end).
#[must_use]
pub fn traverse(tokens: &[Token], mode: Mode, point: usize) -> Traversal {
    let start = match mode {
        Mode::FromRoot => 0,
        Mode::FromPoint => point,
    };
    let mut pos = start;
    let mut cur_depth = 0usize;
    let mut max_depth = 0usize;
    let mut slots: Vec<Slot> = Vec::new();

    let mut node = tokens[pos];
    pos += 1;
    if !node.is_function() {
        return Traversal { len: 1, depth: 1 };
    }

    loop {
        apply(node, &mut slots, &mut cur_depth, &mut max_depth);
        if mode == Mode::FromRoot && pos == point {
            return Traversal {
                len: point,
                depth: cur_depth,
            };
        }
        if slots.len() == 1 {
            // Only the base delimiter remains: the subtree is consumed.
            return Traversal {
                len: pos - start,
                depth: max_depth,
            };
        }
        node = tokens[pos];
        pos += 1;
    }
}

/// Feed one token to the slot stack.
fn apply(token: Token, slots: &mut Vec<Slot>, cur_depth: &mut usize, max_depth: &mut usize) {
    if let Token::Func(op) = token {
        *cur_depth += 1;
        slots.push(Slot::Delim);
        if *max_depth < *cur_depth {
            *max_depth = *cur_depth;
        }
        for _ in 0..op.arity() {
            slots.push(Slot::Arg);
        }
    } else {
        slots.pop();
        // A resolved delimiter also fills one slot of the group below it,
        // so each cascade step pops two entries. The base delimiter stays.
        while slots.len() > 1 && matches!(slots.last(), Some(Slot::Delim)) {
            slots.pop();
            slots.pop();
            *cur_depth -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::program::{GrowConfig, Opcode, Program, Variable, MAX_DEPTH, MAX_PROGRAM_LEN};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn sample() -> Vec<Token> {
        // (add (sin x) (iflte y c0 x (mul y c1)))
        vec![
            Token::Func(Opcode::Add),
            Token::Func(Opcode::Sin),
            Token::Var(Variable::X),
            Token::Func(Opcode::IfLte),
            Token::Var(Variable::Y),
            Token::Const(0),
            Token::Var(Variable::X),
            Token::Func(Opcode::Mul),
            Token::Var(Variable::Y),
            Token::Const(1),
        ]
    }

    #[test]
    fn test_from_point_whole_program() {
        let tokens = sample();
        let result = traverse(&tokens, Mode::FromPoint, 0);
        assert_eq!(result.len, tokens.len());
        assert_eq!(result.depth, 3);
    }

    #[test]
    fn test_from_point_inner_subtrees() {
        let tokens = sample();
        // (sin x): depth counts function nesting levels.
        assert_eq!(
            traverse(&tokens, Mode::FromPoint, 1),
            Traversal { len: 2, depth: 1 }
        );
        // (iflte ...) including the nested (mul ...)
        assert_eq!(
            traverse(&tokens, Mode::FromPoint, 3),
            Traversal { len: 7, depth: 2 }
        );
        // (mul y c1)
        assert_eq!(
            traverse(&tokens, Mode::FromPoint, 7),
            Traversal { len: 3, depth: 1 }
        );
    }

    #[test]
    fn test_from_point_terminal() {
        let tokens = sample();
        assert_eq!(
            traverse(&tokens, Mode::FromPoint, 2),
            Traversal { len: 1, depth: 1 }
        );
    }

    #[test]
    fn test_from_root_nesting_depth() {
        let tokens = sample();
        // Just past the root.
        assert_eq!(
            traverse(&tokens, Mode::FromRoot, 1),
            Traversal { len: 1, depth: 1 }
        );
        // x inside (sin _): sin group still open.
        assert_eq!(
            traverse(&tokens, Mode::FromRoot, 2),
            Traversal { len: 2, depth: 2 }
        );
        // iflte operand: sin group closed again.
        assert_eq!(
            traverse(&tokens, Mode::FromRoot, 4),
            Traversal { len: 4, depth: 2 }
        );
        // y inside (mul _ _) inside (iflte ...).
        assert_eq!(
            traverse(&tokens, Mode::FromRoot, 8),
            Traversal { len: 8, depth: 3 }
        );
    }

    #[test]
    fn test_subtree_lengths_partition_random_programs() {
        // The subtrees hanging off the root partition the rest of the
        // program exactly.
        let grow = GrowConfig::default();
        for seed in 0..32 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let program = Program::random(&mut rng, MAX_DEPTH, MAX_PROGRAM_LEN - 1, &grow);
            let tokens = program.tokens();

            let Token::Func(root) = tokens[0] else {
                panic!("root must be a function");
            };
            let mut pos = 1;
            for _ in 0..root.arity() {
                pos += traverse(tokens, Mode::FromPoint, pos).len;
            }
            assert_eq!(pos, tokens.len());
        }
    }
}
