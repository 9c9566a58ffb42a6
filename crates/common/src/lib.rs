//! pyvm common types.
//!
//! This crate provides the data model shared by the interpreter, the
//! assembler and the CLI:
//!
//! - [`OpCode`]: the instruction set, with mnemonics and operand shapes
//! - [`Instruction`] and [`Operand`]: one decoded instruction
//! - [`InstructionStream`]: instructions indexed by byte offset, with static validation
//! - [`Value`]: the runtime datum, and its operators in [`ops`]
//! - [`OpError`] and [`StreamError`]: operator and validation failures
//!
//! # Dependencies
//!
//! This crate uses `thiserror` and has no other dependencies.

pub mod error;
pub mod instruction;
pub mod opcode;
pub mod ops;
pub mod stream;
pub mod value;

// Re-export commonly used types at the crate root.
pub use error::{OpError, StreamError};
pub use instruction::{CallArgs, Instruction, Operand};
pub use opcode::{OpCode, OperandKind};
pub use ops::{BinaryOp, UnaryOp};
pub use stream::{InstructionStream, INSTRUCTION_SIZE};
pub use value::{Callable, Function, NativeFn, NativeFunction, Value, ValueIter};
