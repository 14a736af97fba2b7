//! Stack-machine evaluation of programs.
//!
//! A preorder-serialized program is evaluated in a single backward scan:
//! terminals push their bound value, and a function of arity `k` pops
//! exactly `k` operand values — by the scan order these are the values of
//! its child subtrees, leftmost on top — and pushes one result. A
//! well-formed program leaves exactly one value; anything else is a
//! structural fault.

use crate::error::{EvalError, EvalResult};
use crate::gp::program::{ConstantPool, Opcode, Token, Variable, END_SENTINEL, FUNC_BASE, MAX_DEPTH};

/// Denominator magnitude below which division returns the numerator
/// unchanged.
pub const DIV_GUARD: f32 = 1e-3;

/// Evaluate one program against one case binding.
///
/// # Errors
///
/// Returns an error when the token sequence is structurally malformed: a
/// function runs out of operands, or more than one value remains at the
/// end.
pub fn evaluate(tokens: &[Token], x: f32, y: f32, constants: &ConstantPool) -> EvalResult<f32> {
    let mut stack: Vec<f32> = Vec::with_capacity(3 * MAX_DEPTH + 1);
    for (index, token) in tokens.iter().enumerate().rev() {
        match *token {
            Token::Var(Variable::X) => stack.push(x),
            Token::Var(Variable::Y) => stack.push(y),
            Token::Const(c) => stack.push(constants.get(c)),
            Token::Func(op) => {
                let value = apply(op, &mut stack).ok_or(EvalError::OperandUnderflow { index })?;
                stack.push(value);
            }
        }
    }
    match *stack.as_slice() {
        [value] => Ok(value),
        _ => Err(EvalError::Unbalanced {
            remaining: stack.len(),
        }),
    }
}

/// Classify one case: a positive evaluation means class `true`.
///
/// # Errors
///
/// Propagates structural faults from [`evaluate`].
pub fn classify(tokens: &[Token], x: f32, y: f32, constants: &ConstantPool) -> EvalResult<bool> {
    Ok(evaluate(tokens, x, y, constants)? > 0.0)
}

/// Evaluate one program from its byte encoding.
///
/// `vals` is the unified value table the accelerated backend uses:
/// `vals[0] = x`, `vals[1] = y`, then the constant pool in token-index
/// order; any terminal byte indexes it directly. The scan covers `bytes`
/// up to the first end sentinel, or the whole slice when none is present
/// (callers that know the occupied length pass a pre-trimmed row).
///
/// # Errors
///
/// Returns an error on structural faults or on a byte outside the token
/// vocabulary.
pub fn evaluate_flat(bytes: &[u8], vals: &[f32]) -> EvalResult<f32> {
    let len = bytes
        .iter()
        .position(|&b| b == END_SENTINEL)
        .unwrap_or(bytes.len());

    let mut stack: Vec<f32> = Vec::with_capacity(3 * MAX_DEPTH + 1);
    for (index, &code) in bytes[..len].iter().enumerate().rev() {
        if code < FUNC_BASE {
            let value = vals
                .get(usize::from(code))
                .copied()
                .ok_or(EvalError::UnknownToken { byte: code, index })?;
            stack.push(value);
        } else if let Some(op) = Opcode::from_byte(code) {
            let value = apply(op, &mut stack).ok_or(EvalError::OperandUnderflow { index })?;
            stack.push(value);
        } else {
            return Err(EvalError::UnknownToken { byte: code, index });
        }
    }
    match *stack.as_slice() {
        [value] => Ok(value),
        _ => Err(EvalError::Unbalanced {
            remaining: stack.len(),
        }),
    }
}

/// Pop an opcode's operands and compute its result.
///
/// The top of the stack is the leftmost operand. Returns `None` when the
/// stack runs dry.
fn apply(op: Opcode, stack: &mut Vec<f32>) -> Option<f32> {
    Some(match op {
        Opcode::Add => {
            let a = stack.pop()?;
            let b = stack.pop()?;
            a + b
        }
        Opcode::Sub => {
            let a = stack.pop()?;
            let b = stack.pop()?;
            a - b
        }
        Opcode::Mul => {
            let a = stack.pop()?;
            let b = stack.pop()?;
            a * b
        }
        Opcode::Div => {
            let a = stack.pop()?;
            let b = stack.pop()?;
            if b.abs() < DIV_GUARD { a } else { a / b }
        }
        Opcode::IfLte => {
            let a = stack.pop()?;
            let b = stack.pop()?;
            let c = stack.pop()?;
            let d = stack.pop()?;
            if a <= b { c } else { d }
        }
        Opcode::Cos => stack.pop()?.cos(),
        Opcode::Sin => stack.pop()?.sin(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)] // Exact results are the point here

    use super::*;
    use crate::gp::program::{GrowConfig, Program, MAX_PROGRAM_LEN, NUM_CONSTANTS};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn pool() -> ConstantPool {
        let mut rng = SmallRng::seed_from_u64(0);
        ConstantPool::random(&mut rng)
    }

    #[test]
    fn test_operand_order() {
        let constants = pool();
        // (sub x y)
        let tokens = vec![
            Token::Func(Opcode::Sub),
            Token::Var(Variable::X),
            Token::Var(Variable::Y),
        ];
        assert_eq!(evaluate(&tokens, 7.0, 3.0, &constants).unwrap(), 4.0);
    }

    #[test]
    fn test_division_guard() {
        let constants = pool();
        // (div x y)
        let tokens = vec![
            Token::Func(Opcode::Div),
            Token::Var(Variable::X),
            Token::Var(Variable::Y),
        ];
        // Near-zero denominator of either sign returns the numerator.
        assert_eq!(evaluate(&tokens, 5.0, 0.0004, &constants).unwrap(), 5.0);
        assert_eq!(evaluate(&tokens, 5.0, -0.0004, &constants).unwrap(), 5.0);
        assert_eq!(evaluate(&tokens, 6.0, 2.0, &constants).unwrap(), 3.0);
        assert_eq!(evaluate(&tokens, 6.0, -2.0, &constants).unwrap(), -3.0);
    }

    #[test]
    fn test_iflte_branches() {
        let constants = pool();
        // (iflte x y c0 c1)
        let tokens = vec![
            Token::Func(Opcode::IfLte),
            Token::Var(Variable::X),
            Token::Var(Variable::Y),
            Token::Const(0),
            Token::Const(1),
        ];
        assert_eq!(
            evaluate(&tokens, 1.0, 2.0, &constants).unwrap(),
            constants.get(0)
        );
        assert_eq!(
            evaluate(&tokens, 3.0, 2.0, &constants).unwrap(),
            constants.get(1)
        );
    }

    #[test]
    fn test_random_programs_leave_one_value() {
        let grow = GrowConfig::default();
        let constants = pool();
        let mut rng = SmallRng::seed_from_u64(42);

        for _ in 0..64 {
            let program = Program::random(&mut rng, 10, MAX_PROGRAM_LEN - 1, &grow);
            assert!(evaluate(program.tokens(), 0.5, -0.5, &constants).is_ok());
        }
    }

    #[test]
    fn test_malformed_sequence_is_a_fault() {
        let constants = pool();
        // A function with a missing operand.
        let short = vec![Token::Func(Opcode::Add), Token::Var(Variable::X)];
        assert_eq!(
            evaluate(&short, 0.0, 0.0, &constants),
            Err(EvalError::OperandUnderflow { index: 0 })
        );

        // Two disjoint values with no root combining them.
        let loose = vec![Token::Var(Variable::X), Token::Var(Variable::Y)];
        assert_eq!(
            evaluate(&loose, 0.0, 0.0, &constants),
            Err(EvalError::Unbalanced { remaining: 2 })
        );
    }

    #[test]
    fn test_flat_evaluation_matches_tokens() {
        let grow = GrowConfig::default();
        let constants = pool();
        let mut rng = SmallRng::seed_from_u64(7);

        let mut vals = [0.0f32; 2 + NUM_CONSTANTS];
        vals[2..].copy_from_slice(constants.as_slice());

        for case in 0u8..32 {
            let program = Program::random(&mut rng, 10, MAX_PROGRAM_LEN - 1, &grow);
            let x = f32::from(case) * 0.25 - 4.0;
            let y = 4.0 - f32::from(case) * 0.25;
            vals[0] = x;
            vals[1] = y;

            let by_tokens = evaluate(program.tokens(), x, y, &constants).unwrap();
            let by_bytes = evaluate_flat(&program.encode(), &vals).unwrap();
            assert_eq!(by_tokens.to_bits(), by_bytes.to_bits());
        }
    }
}
