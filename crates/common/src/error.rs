//! Errors shared by the pyvm crates.
//!
//! [`OpError`] is raised by value operators and native functions; the VM
//! wraps it with the failing instruction index. [`StreamError`] is a
//! static finding of [`InstructionStream::validate`](crate::InstructionStream::validate).

use crate::opcode::OperandKind;
use thiserror::Error;

/// Errors produced by operators on values and by native functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    /// Unary operator applied to a type that does not define it.
    #[error("bad operand type for unary {op}: '{operand}'")]
    UnsupportedOperand {
        op: &'static str,
        operand: &'static str,
    },

    /// Binary operator applied to a pair of types that does not define it.
    #[error("unsupported operand type(s) for {op}: '{left}' and '{right}'")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Division or modulo by zero, or zero raised to a negative power.
    #[error("{message}")]
    ZeroDivision { message: &'static str },

    /// Integer result does not fit in 64 bits.
    #[error("integer overflow in {op}")]
    Overflow { op: &'static str },

    /// Negative shift count.
    #[error("negative shift count")]
    NegativeShift,

    /// Sequence index outside the sequence.
    #[error("{container} index out of range")]
    IndexOutOfRange { container: &'static str },

    /// Sequence indexed by a non-integer.
    #[error("{container} indices must be integers, not '{index}'")]
    IndexType {
        container: &'static str,
        index: &'static str,
    },

    /// Subscript on a value that is not a sequence.
    #[error("'{type_name}' object is not subscriptable")]
    NotSubscriptable { type_name: &'static str },

    /// Value cannot be a set member.
    #[error("unhashable type: '{type_name}'")]
    Unhashable { type_name: &'static str },

    /// Value cannot be iterated.
    #[error("'{type_name}' object is not iterable")]
    NotIterable { type_name: &'static str },

    /// Iterator has no more items.
    #[error("StopIteration")]
    StopIteration,

    /// A native function received arguments of the wrong number or type.
    #[error("{message}")]
    InvalidArgument { message: String },

    /// A native function received an argument of the right type but an
    /// unusable value.
    #[error("{message}")]
    InvalidValue { message: String },
}

/// Static problems found in an instruction stream before execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Operand missing or of the wrong shape for the opcode.
    #[error("{opcode} at offset {offset} expects a {expected:?} operand")]
    OperandMismatch {
        offset: u32,
        opcode: &'static str,
        expected: OperandKind,
    },

    /// Byte offsets must strictly increase along the stream.
    #[error("offset {offset} does not follow offset {previous}")]
    NonMonotonicOffset { offset: u32, previous: u32 },

    /// A jump lands between instructions or past the end of the stream.
    #[error("{opcode} at offset {offset} jumps to {target}, which is not an instruction boundary")]
    InvalidJumpTarget {
        offset: u32,
        opcode: &'static str,
        target: u64,
    },

    /// CALL_FUNCTION count with bits set above the keyword byte.
    #[error("CALL_FUNCTION at offset {offset} has count {count:#x}, which exceeds {max:#x}")]
    CallCountOutOfRange { offset: u32, count: u32, max: u32 },

    /// An error inside the body of an interpreted function constant.
    #[error("in function '{function}': {source}")]
    InFunction {
        function: String,
        source: Box<StreamError>,
    },
}
