//! Instruction streams.
//!
//! An [`InstructionStream`] is the unit the VM executes: an ordered list of
//! decoded instructions plus a map from byte offset to instruction index,
//! built once at construction and never changed afterwards.

use std::collections::HashMap;

use crate::error::StreamError;
use crate::instruction::{CallArgs, Instruction, Operand};
use crate::opcode::{OpCode, OperandKind};
use crate::value::{Callable, Value};

/// Width of one instruction in bytes, as emitted by wordcode compilers.
pub const INSTRUCTION_SIZE: u32 = 2;

/// A sequence of instructions, indexable by position and by byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
    offsets: HashMap<u32, usize>,
}

impl InstructionStream {
    /// Create a stream, indexing every instruction by its byte offset.
    ///
    /// The end offset (one instruction past the last) maps to `len()`, so
    /// a jump there ends evaluation. If two instructions share an offset,
    /// the first one wins; [`validate`](Self::validate) reports it.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let mut offsets = HashMap::with_capacity(instructions.len() + 1);
        for (index, instr) in instructions.iter().enumerate() {
            offsets.entry(instr.offset).or_insert(index);
        }
        let end = end_offset_of(&instructions);
        offsets.entry(end).or_insert(instructions.len());
        Self {
            instructions,
            offsets,
        }
    }

    /// Create a stream from opcode/operand pairs, assigning offsets 0, 2, 4, ...
    pub fn from_ops(ops: Vec<(OpCode, Option<Operand>)>) -> Self {
        let instructions = ops
            .into_iter()
            .zip((0..).step_by(INSTRUCTION_SIZE as usize))
            .map(|((opcode, operand), offset)| Instruction::new(opcode, operand, offset))
            .collect();
        Self::new(instructions)
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the stream has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at `index`.
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Iterate over the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// The instructions as a slice.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Index of the instruction at byte offset `offset`.
    ///
    /// The end offset resolves to `len()`.
    pub fn index_of(&self, offset: u32) -> Option<usize> {
        self.offsets.get(&offset).copied()
    }

    /// Offset one instruction past the last, or 0 for an empty stream.
    pub fn end_offset(&self) -> u32 {
        end_offset_of(&self.instructions)
    }

    /// Offset of the instruction following `index`, or the end offset.
    pub fn next_offset(&self, index: usize) -> u32 {
        match self.instructions.get(index + 1) {
            Some(next) => next.offset,
            None => self.end_offset(),
        }
    }

    /// The byte offset a jump at `index` targets.
    ///
    /// Relative jumps count from the following instruction. Returns `None`
    /// if the instruction is not a jump or lacks its offset operand.
    pub fn jump_target(&self, index: usize) -> Option<u64> {
        let instr = self.instructions.get(index)?;
        let arg = u64::from(instr.offset_arg()?);
        match instr.opcode.operand_kind() {
            OperandKind::RelativeJump => Some(u64::from(self.next_offset(index)) + arg),
            OperandKind::AbsoluteJump => Some(arg),
            _ => None,
        }
    }

    /// Index a jump at `index` lands on, if the target is an instruction
    /// boundary or the end of the stream.
    pub fn resolve_jump(&self, index: usize) -> Option<usize> {
        let target = u32::try_from(self.jump_target(index)?).ok()?;
        self.index_of(target)
    }

    /// Check the stream statically, collecting every problem found.
    ///
    /// Opcodes the VM does not implement are accepted here; they only fail
    /// when executed.
    pub fn validate(&self) -> Result<(), Vec<StreamError>> {
        let mut errors = Vec::new();
        let mut previous: Option<u32> = None;

        for (index, instr) in self.instructions.iter().enumerate() {
            if let Some(prev) = previous {
                if instr.offset <= prev {
                    errors.push(StreamError::NonMonotonicOffset {
                        offset: instr.offset,
                        previous: prev,
                    });
                }
            }
            previous = Some(instr.offset);

            if !instr.operand_matches() {
                errors.push(StreamError::OperandMismatch {
                    offset: instr.offset,
                    opcode: instr.opcode.mnemonic(),
                    expected: instr.opcode.operand_kind(),
                });
                continue;
            }

            if instr.opcode == OpCode::CallFunction {
                if let Some(count) = instr.count().filter(|&c| c > CallArgs::MAX_COUNT) {
                    errors.push(StreamError::CallCountOutOfRange {
                        offset: instr.offset,
                        count,
                        max: CallArgs::MAX_COUNT,
                    });
                }
            }

            if let Some(target) = self.jump_target(index) {
                if self.resolve_jump(index).is_none() {
                    errors.push(StreamError::InvalidJumpTarget {
                        offset: instr.offset,
                        opcode: instr.opcode.mnemonic(),
                        target,
                    });
                }
            }

            if let Some(Value::Callable(Callable::Interpreted(function))) = instr.const_value() {
                if let Err(nested) = function.code.validate() {
                    errors.extend(nested.into_iter().map(|source| StreamError::InFunction {
                        function: function.name.clone(),
                        source: Box::new(source),
                    }));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for InstructionStream {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn end_offset_of(instructions: &[Instruction]) -> u32 {
    instructions
        .last()
        .map_or(0, |last| last.offset.saturating_add(INSTRUCTION_SIZE))
}
