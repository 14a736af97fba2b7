//! Error types for program decoding and evaluation.

use std::fmt;

/// Error decoding a serialized program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A byte outside the token vocabulary.
    UnknownByte {
        /// The offending byte.
        byte: u8,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownByte { byte } => write!(f, "unknown token byte: {byte:#04x}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Structural faults raised by the stack evaluator.
///
/// Any of these means the evaluated sequence was not a well-formed
/// preorder program; a run must abort rather than score it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    /// A function token found too few operand values on the stack.
    OperandUnderflow {
        /// Token index (within the occupied sequence) of the function.
        index: usize,
    },
    /// Evaluation finished with more or fewer than one value.
    Unbalanced {
        /// Values left on the stack.
        remaining: usize,
    },
    /// A byte outside the token vocabulary in a flattened program.
    UnknownToken {
        /// The offending byte.
        byte: u8,
        /// Byte index within the program row.
        index: usize,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::OperandUnderflow { index } => {
                write!(f, "operand underflow at token {index}")
            }
            EvalError::Unbalanced { remaining } => {
                write!(f, "evaluation left {remaining} values on the stack")
            }
            EvalError::UnknownToken { byte, index } => {
                write!(f, "unknown token byte {byte:#04x} at offset {index}")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Result type for program evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let underflow = EvalError::OperandUnderflow { index: 4 };
        assert!(underflow.to_string().contains("token 4"));

        let unbalanced = EvalError::Unbalanced { remaining: 3 };
        assert!(unbalanced.to_string().contains("3 values"));

        let unknown = DecodeError::UnknownByte { byte: 0xfa };
        assert!(unknown.to_string().contains("0xfa"));
    }
}
