//! Runtime errors for the pyvm execution engine.
//!
//! Every error includes the index (`at`) of the instruction that failed.
//! Errors raised inside a called function carry the callee's index and
//! propagate unchanged through every calling frame.

use pyvm_common::{OpCode, OpError};
use thiserror::Error;

/// Errors that abort evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Pop on an empty operand stack.
    #[error("stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    /// Name absent from the local, global and builtin scopes.
    #[error("name '{name}' is not defined at instruction {at}")]
    UnboundName { at: usize, name: String },

    /// Unary operator applied to a type that does not define it.
    #[error("bad operand type for unary {op}: '{operand}' at instruction {at}")]
    UnsupportedOperand {
        at: usize,
        op: &'static str,
        operand: &'static str,
    },

    /// Operator or native function failed.
    #[error("{source} at instruction {at}")]
    Operation {
        at: usize,
        #[source]
        source: OpError,
    },

    /// Opcode this engine does not implement.
    #[error("unsupported opcode {opcode} at instruction {at}")]
    UnsupportedOpcode { at: usize, opcode: OpCode },

    /// Operand missing or of the wrong shape for the opcode.
    #[error("{opcode} is missing its operand at instruction {at}")]
    MissingOperand { at: usize, opcode: OpCode },

    /// Jump to an offset that is not an instruction boundary.
    #[error("jump to offset {target}, which is not an instruction boundary, at instruction {at}")]
    InvalidJumpTarget { at: usize, target: u64 },

    /// POP_BLOCK or BREAK_LOOP with no active loop block.
    #[error("no active loop block at instruction {at}")]
    BlockUnderflow { at: usize },

    /// CALL_FUNCTION on a value that is not callable.
    #[error("'{type_name}' object is not callable at instruction {at}")]
    NotCallable { at: usize, type_name: &'static str },

    /// Interpreted function called with the wrong number of arguments.
    #[error("{name}() takes {expected} positional arguments but {given} were given at instruction {at}")]
    ArgumentCount {
        at: usize,
        name: String,
        expected: usize,
        given: usize,
    },

    /// CALL_FUNCTION count with bits set above the keyword byte.
    #[error("CALL_FUNCTION count {count:#x} is out of range at instruction {at}")]
    InvalidCallCount { at: usize, count: u32 },

    /// CALL_FUNCTION with keyword arguments.
    #[error("keyword arguments are not supported ({count} given) at instruction {at}")]
    KeywordArgumentsUnsupported { at: usize, count: usize },

    /// Interpreted calls nested deeper than the configured limit.
    #[error("maximum call depth {limit} exceeded at instruction {at}")]
    CallDepthExceeded { at: usize, limit: usize },
}

impl RuntimeError {
    /// Attach an instruction index to an operator failure.
    pub fn from_op(at: usize, err: OpError) -> Self {
        match err {
            OpError::UnsupportedOperand { op, operand } => {
                RuntimeError::UnsupportedOperand { at, op, operand }
            }
            source => RuntimeError::Operation { at, source },
        }
    }

    /// Index of the failing instruction.
    pub fn at(&self) -> usize {
        match self {
            RuntimeError::StackUnderflow { at }
            | RuntimeError::UnboundName { at, .. }
            | RuntimeError::UnsupportedOperand { at, .. }
            | RuntimeError::Operation { at, .. }
            | RuntimeError::UnsupportedOpcode { at, .. }
            | RuntimeError::MissingOperand { at, .. }
            | RuntimeError::InvalidJumpTarget { at, .. }
            | RuntimeError::BlockUnderflow { at }
            | RuntimeError::NotCallable { at, .. }
            | RuntimeError::ArgumentCount { at, .. }
            | RuntimeError::InvalidCallCount { at, .. }
            | RuntimeError::KeywordArgumentsUnsupported { at, .. }
            | RuntimeError::CallDepthExceeded { at, .. } => *at,
        }
    }
}
