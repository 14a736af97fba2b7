//! Flat preorder program representation.
//!
//! A program is one expression tree serialized as a flat token sequence in
//! preorder: a function token is immediately followed by its operand
//! subtrees, left to right. Because every opcode has a fixed arity, subtree
//! boundaries can be recovered from the token stream alone (see
//! [`crate::gp::traverse`]); no parent or child pointers are ever
//! materialized, and genetic operators work by slicing and splicing the
//! sequence.

// Token byte codes and constant indices use intentional narrow casts
#![allow(clippy::cast_possible_truncation)]

use crate::error::DecodeError;
use crate::gp::traverse::{self, Mode, Slot};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum serialized length of a program, including the end sentinel.
pub const MAX_PROGRAM_LEN: usize = 200;

/// Maximum expression tree depth.
pub const MAX_DEPTH: usize = 10;

/// Number of constants in the constant pool.
pub const NUM_CONSTANTS: usize = 20;

/// Lower bound of the constant pool sampling range.
pub const CONSTANT_MIN: f32 = -1.0;

/// Upper bound of the constant pool sampling range.
pub const CONSTANT_MAX: f32 = 1.0;

/// Byte code of the first constant token.
const CONST_BASE: u8 = 2;

/// Byte code of the first function token.
pub(crate) const FUNC_BASE: u8 = CONST_BASE + NUM_CONSTANTS as u8;

/// End-of-program sentinel byte.
pub(crate) const END_SENTINEL: u8 = FUNC_BASE + Opcode::ALL.len() as u8;

/// Largest opcode arity; the worst-case token cost of expanding one slot.
pub(crate) const MAX_ARITY: usize = 4;

/// Input variable bound per evaluation case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// Horizontal coordinate of a case.
    X,
    /// Vertical coordinate of a case.
    Y,
}

/// Function opcodes with fixed arities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Addition.
    Add,
    /// Multiplication.
    Mul,
    /// Subtraction.
    Sub,
    /// Division (guarded: a near-zero denominator returns the numerator).
    Div,
    /// Four-way conditional: `a <= b` selects `c`, otherwise `d`.
    IfLte,
    /// Cosine.
    Cos,
    /// Sine.
    Sin,
}

impl Opcode {
    /// All opcodes, in byte-code order.
    pub const ALL: [Self; 7] = [
        Self::Add,
        Self::Mul,
        Self::Sub,
        Self::Div,
        Self::IfLte,
        Self::Cos,
        Self::Sin,
    ];

    /// Opcodes allowed at the root of a program (unary trig excluded).
    pub const ROOT: [Self; 5] = [Self::Add, Self::Mul, Self::Sub, Self::Div, Self::IfLte];

    /// Number of operand subtrees this opcode consumes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Add | Self::Mul | Self::Sub | Self::Div => 2,
            Self::IfLte => 4,
            Self::Cos | Self::Sin => 1,
        }
    }

    /// Lower-case mnemonic used when rendering programs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Mul => "mul",
            Self::Sub => "sub",
            Self::Div => "div",
            Self::IfLte => "iflte",
            Self::Cos => "cos",
            Self::Sin => "sin",
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        byte.checked_sub(FUNC_BASE)
            .and_then(|offset| Self::ALL.get(usize::from(offset)).copied())
    }

    const fn code(self) -> u8 {
        match self {
            Self::Add => 0,
            Self::Mul => 1,
            Self::Sub => 2,
            Self::Div => 3,
            Self::IfLte => 4,
            Self::Cos => 5,
            Self::Sin => 6,
        }
    }
}

/// One primitive in a serialized program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A bound input variable.
    Var(Variable),
    /// An index into the constant pool.
    Const(u8),
    /// A function of fixed arity.
    Func(Opcode),
}

impl Token {
    /// Byte code of this token.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Var(Variable::X) => 0,
            Self::Var(Variable::Y) => 1,
            Self::Const(index) => CONST_BASE + index,
            Self::Func(op) => FUNC_BASE + op.code(),
        }
    }

    /// Decode a token from its byte code.
    ///
    /// # Errors
    ///
    /// Returns an error for the end sentinel or any unassigned byte.
    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        match byte {
            0 => Ok(Self::Var(Variable::X)),
            1 => Ok(Self::Var(Variable::Y)),
            b if (CONST_BASE..FUNC_BASE).contains(&b) => Ok(Self::Const(b - CONST_BASE)),
            b => Opcode::from_byte(b)
                .map(Self::Func)
                .ok_or(DecodeError::UnknownByte { byte }),
        }
    }

    /// True for function tokens.
    #[must_use]
    pub const fn is_function(self) -> bool {
        matches!(self, Self::Func(_))
    }
}

/// Immutable pool of numeric literals referenced by constant tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPool([f32; NUM_CONSTANTS]);

impl ConstantPool {
    /// Sample a pool from Uniform[[`CONSTANT_MIN`], [`CONSTANT_MAX`]).
    #[must_use]
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut values = [0.0f32; NUM_CONSTANTS];
        for value in &mut values {
            *value = rng.gen_range(CONSTANT_MIN..CONSTANT_MAX);
        }
        Self(values)
    }

    /// Look up one constant by token index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside `[0, NUM_CONSTANTS)`.
    #[must_use]
    pub fn get(&self, index: u8) -> f32 {
        self.0[usize::from(index)]
    }

    /// All constants, in token-index order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Probabilities steering random program growth.
///
/// A pending slot expands into a function with probability `func_prob`
/// (budget permitting) and otherwise closes with a variable
/// (`var_prob` of the total mass) or a constant (the remainder).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrowConfig {
    /// Probability of expanding a slot into a function.
    pub func_prob: f64,
    /// Probability of closing a slot with a variable.
    pub var_prob: f64,
}

impl Default for GrowConfig {
    fn default() -> Self {
        Self {
            func_prob: 0.4,
            var_prob: 0.3,
        }
    }
}

/// One candidate individual: an expression tree as a flat preorder token
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    tokens: Vec<Token>,
}

impl Program {
    /// Grow a random program within the given depth and length budgets.
    ///
    /// The root is always drawn from [`Opcode::ROOT`]. Growth keeps an
    /// explicit stack of pending operand slots, with a delimiter pushed
    /// ahead of each function's slot group. A draw below `grow.func_prob`
    /// expands the current slot into a fresh function, but only while the
    /// committed minimum length and the nesting depth stay inside the
    /// budgets (a blocked expansion draw is discarded and re-rolled).
    /// Any other draw closes the slot with a terminal and cascades pops
    /// through delimiter groups the terminal resolves. The depth and
    /// length invariants therefore hold by construction.
    #[must_use]
    pub fn random<R: Rng>(rng: &mut R, max_depth: usize, max_len: usize, grow: &GrowConfig) -> Self {
        let mut tokens = Vec::with_capacity(max_len.min(MAX_PROGRAM_LEN));
        let mut slots: Vec<Slot> = Vec::new();

        let root = Opcode::ROOT[rng.gen_range(0..Opcode::ROOT.len())];
        tokens.push(Token::Func(root));
        for _ in 0..root.arity() {
            slots.push(Slot::Arg);
        }
        let mut min_len = 1 + root.arity();
        let mut depth = 1usize;

        while !slots.is_empty() {
            let prob: f64 = rng.gen_range(0.0..1.0);
            if prob < grow.func_prob {
                if min_len + MAX_ARITY <= max_len && depth + 1 < max_depth {
                    depth += 1;
                    slots.push(Slot::Delim);
                    let op = Opcode::ALL[rng.gen_range(0..Opcode::ALL.len())];
                    min_len += op.arity();
                    for _ in 0..op.arity() {
                        slots.push(Slot::Arg);
                    }
                    tokens.push(Token::Func(op));
                }
            } else {
                let terminal = if prob < grow.func_prob + grow.var_prob {
                    Token::Var(if rng.gen_bool(0.5) { Variable::X } else { Variable::Y })
                } else {
                    Token::Const(rng.gen_range(0..NUM_CONSTANTS as u8))
                };
                tokens.push(terminal);
                slots.pop();
                // A resolved delimiter also fills one slot of the group
                // below it, so each cascade step pops two entries.
                while matches!(slots.last(), Some(Slot::Delim)) {
                    slots.pop();
                    slots.pop();
                    depth -= 1;
                }
            }
        }

        Self { tokens }
    }

    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Occupied token count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when the program holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The serialized token sequence.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tree depth, recovered from the token stream.
    ///
    /// # Panics
    ///
    /// Panics if the program is empty or structurally malformed.
    #[must_use]
    pub fn depth(&self) -> usize {
        traverse::traverse(&self.tokens, Mode::FromPoint, 0).depth
    }

    /// Serialize into a fixed-size buffer, padded with the end sentinel.
    #[must_use]
    pub fn encode(&self) -> [u8; MAX_PROGRAM_LEN] {
        let mut buf = [END_SENTINEL; MAX_PROGRAM_LEN];
        for (slot, token) in buf.iter_mut().zip(&self.tokens) {
            *slot = token.to_byte();
        }
        buf
    }

    /// Deserialize a sentinel-terminated byte sequence.
    ///
    /// Decoding stops at the first end sentinel, or at the end of the
    /// slice if no sentinel is present.
    ///
    /// # Errors
    ///
    /// Returns an error on any unassigned byte before the sentinel.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut tokens = Vec::new();
        for &byte in bytes {
            if byte == END_SENTINEL {
                break;
            }
            tokens.push(Token::from_byte(byte)?);
        }
        Ok(Self { tokens })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pos = 0;
        write_node(&self.tokens, &mut pos, f)
    }
}

/// Render the subtree starting at `*pos` in prefix notation.
fn write_node(tokens: &[Token], pos: &mut usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(&token) = tokens.get(*pos) else {
        return write!(f, "?");
    };
    *pos += 1;
    match token {
        Token::Var(Variable::X) => write!(f, "x"),
        Token::Var(Variable::Y) => write!(f, "y"),
        Token::Const(index) => write!(f, "c{index}"),
        Token::Func(op) => {
            write!(f, "({}", op.name())?;
            for _ in 0..op.arity() {
                write!(f, " ")?;
                write_node(tokens, pos, f)?;
            }
            write!(f, ")")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_random_program_invariants() {
        let grow = GrowConfig::default();
        for seed in 0..64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let program = Program::random(&mut rng, MAX_DEPTH, MAX_PROGRAM_LEN - 1, &grow);

            assert!(program.len() >= 3);
            assert!(program.len() <= MAX_PROGRAM_LEN - 1);
            assert!(program.depth() <= MAX_DEPTH);
            assert!(Opcode::ROOT
                .iter()
                .any(|&op| program.tokens()[0] == Token::Func(op)));
        }
    }

    #[test]
    fn test_tight_budgets_yield_minimal_tree() {
        let grow = GrowConfig::default();
        for seed in 0..16 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let program = Program::random(&mut rng, 1, 5, &grow);

            assert!(program.len() <= 5);
            assert_eq!(program.depth(), 1);
        }
    }

    #[test]
    fn test_codec_round_trip() {
        let grow = GrowConfig::default();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..32 {
            let program = Program::random(&mut rng, MAX_DEPTH, MAX_PROGRAM_LEN - 1, &grow);
            let decoded = Program::decode(&program.encode()).unwrap();
            assert_eq!(program, decoded);
        }
    }

    #[test]
    fn test_decode_rejects_unknown_byte() {
        let bytes = [Token::Func(Opcode::Add).to_byte(), 0, 250];
        assert!(Program::decode(&bytes).is_err());
    }

    #[test]
    fn test_display_prefix_notation() {
        let program = Program::from_tokens(vec![
            Token::Func(Opcode::Add),
            Token::Var(Variable::X),
            Token::Func(Opcode::Sin),
            Token::Const(3),
        ]);
        assert_eq!(program.to_string(), "(add x (sin c3))");
    }

    #[test]
    fn test_constant_pool_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        let pool = ConstantPool::random(&mut rng);
        for &value in pool.as_slice() {
            assert!((CONSTANT_MIN..CONSTANT_MAX).contains(&value));
        }
    }
}
