//! Frame state: operand stack, locals, loop blocks and program counter.

use pyvm_common::{Instruction, InstructionStream, Value};

use crate::config::VmConfig;
use crate::error::RuntimeError;
use crate::scope::{Builtins, Namespace};

/// Read-only state shared by a frame and every frame it calls into.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Global names.
    pub globals: &'a Namespace,
    /// Builtin names.
    pub builtins: &'a Builtins,
    /// Execution limits.
    pub config: &'a VmConfig,
}

/// An active loop, pushed by SETUP_LOOP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopBlock {
    /// Index of the first instruction of the loop body.
    pub start_pc: usize,
    /// Index of the first instruction after the loop.
    pub end_pc: usize,
    /// Operand stack depth when the block was entered.
    pub stack_level: usize,
}

/// Outcome of executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Evaluation continues at `pc`.
    Continue,
    /// The frame finished with this value.
    Return(Value),
}

/// One independent run of the execution loop.
///
/// A frame owns its stack and locals. Globals, builtins and configuration
/// are borrowed and never modified.
#[derive(Debug)]
pub struct Frame<'a> {
    /// The code being executed.
    pub(crate) code: &'a InstructionStream,
    /// Shared read-only scopes and limits.
    pub(crate) ctx: Context<'a>,
    /// Operand stack.
    pub(crate) stack: Vec<Value>,
    /// Local names.
    pub(crate) locals: Namespace,
    /// Active loop blocks, innermost last.
    pub(crate) blocks: Vec<LoopBlock>,
    /// Index of the next instruction to execute.
    pub(crate) pc: usize,
    /// Index of the instruction currently executing.
    pub(crate) current: usize,
    /// Number of interpreted calls between this frame and the top level.
    pub(crate) depth: usize,
}

impl<'a> Frame<'a> {
    /// Create a top-level frame with empty locals.
    pub fn new(code: &'a InstructionStream, ctx: Context<'a>) -> Self {
        Self::nested(code, ctx, 0)
    }

    pub(crate) fn nested(code: &'a InstructionStream, ctx: Context<'a>, depth: usize) -> Self {
        Self {
            code,
            ctx,
            stack: Vec::new(),
            locals: Namespace::new(),
            blocks: Vec::new(),
            pc: 0,
            current: 0,
            depth,
        }
    }

    /// Seed the frame's locals.
    pub fn with_locals(mut self, locals: Namespace) -> Self {
        self.locals = locals;
        self
    }

    /// The operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// The local names.
    pub fn locals(&self) -> &Namespace {
        &self.locals
    }

    /// Consume the frame, keeping its locals.
    pub fn into_locals(self) -> Namespace {
        self.locals
    }

    /// Index of the next instruction to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Push a value onto the operand stack.
    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop a value from the operand stack.
    pub(crate) fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow {
            at: self.current,
        })
    }

    /// Pop `n` values, returned in the order they were pushed.
    pub(crate) fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        let len = self.stack.len();
        if n > len {
            return Err(RuntimeError::StackUnderflow { at: self.current });
        }
        Ok(self.stack.split_off(len - n))
    }

    /// The value `depth` slots below the top, without popping.
    pub(crate) fn peek(&self, depth: usize) -> Result<&Value, RuntimeError> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|index| self.stack.get(index))
            .ok_or(RuntimeError::StackUnderflow { at: self.current })
    }

    /// Fetch the instruction at `pc`, or `None` past the end.
    pub(crate) fn fetch(&self) -> Option<&'a Instruction> {
        self.code.get(self.pc)
    }
}
