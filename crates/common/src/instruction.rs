//! Decoded instructions.
//!
//! An instruction is an opcode, an optional decoded operand, and the byte
//! offset the compiler assigned to it. Jump operands are byte offsets too;
//! [`InstructionStream`](crate::InstructionStream) translates them to indices.

use std::fmt;

use crate::opcode::{OpCode, OperandKind};
use crate::value::Value;

/// A decoded operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Literal value for LOAD_CONST.
    Const(Value),
    /// Name for the scope opcodes.
    Name(String),
    /// Byte offset (absolute target or relative delta, per opcode).
    Offset(u32),
    /// Element or argument count.
    Count(u32),
}

impl Operand {
    /// Whether this operand has the shape `kind` requires.
    pub fn matches(&self, kind: OperandKind) -> bool {
        matches!(
            (self, kind),
            (Operand::Const(_), OperandKind::Const)
                | (Operand::Name(_), OperandKind::Name)
                | (Operand::Count(_), OperandKind::Count)
                | (
                    Operand::Offset(_),
                    OperandKind::RelativeJump | OperandKind::AbsoluteJump
                )
        )
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(value) => write!(f, "{value}"),
            Operand::Name(name) => f.write_str(name),
            Operand::Offset(n) | Operand::Count(n) => write!(f, "{n}"),
        }
    }
}

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The operation to perform.
    pub opcode: OpCode,
    /// Decoded operand, if the opcode takes one.
    pub operand: Option<Operand>,
    /// Byte offset assigned by the compiler.
    pub offset: u32,
}

impl Instruction {
    /// Create a new instruction.
    pub fn new(opcode: OpCode, operand: Option<Operand>, offset: u32) -> Self {
        Self {
            opcode,
            operand,
            offset,
        }
    }

    /// The literal of a LOAD_CONST.
    pub fn const_value(&self) -> Option<&Value> {
        match &self.operand {
            Some(Operand::Const(value)) => Some(value),
            _ => None,
        }
    }

    /// The name operand.
    pub fn name(&self) -> Option<&str> {
        match &self.operand {
            Some(Operand::Name(name)) => Some(name),
            _ => None,
        }
    }

    /// The byte offset operand of a jump.
    pub fn offset_arg(&self) -> Option<u32> {
        match self.operand {
            Some(Operand::Offset(n)) => Some(n),
            _ => None,
        }
    }

    /// The count operand.
    pub fn count(&self) -> Option<u32> {
        match self.operand {
            Some(Operand::Count(n)) => Some(n),
            _ => None,
        }
    }

    /// Whether the operand is present exactly when the opcode needs one,
    /// and has the right shape.
    pub fn operand_matches(&self) -> bool {
        match (self.opcode.operand_kind(), &self.operand) {
            (OperandKind::None, None) => true,
            (kind, Some(operand)) => operand.matches(kind),
            _ => false,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4} {}", self.offset, self.opcode.mnemonic())?;
        if let Some(operand) = &self.operand {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Argument counts packed into a CALL_FUNCTION operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallArgs {
    /// Number of positional arguments.
    pub positional: usize,
    /// Number of keyword arguments.
    pub keyword: usize,
}

impl CallArgs {
    /// Largest operand that packs only the two count bytes.
    pub const MAX_COUNT: u32 = 0xffff;

    /// Unpack the positional count (low byte) and keyword count (next byte).
    ///
    /// Returns `None` if any bit above the keyword byte is set.
    pub fn from_count(count: u32) -> Option<Self> {
        if count > Self::MAX_COUNT {
            return None;
        }
        Some(Self {
            positional: (count & 0xff) as usize,
            keyword: ((count >> 8) & 0xff) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let load = Instruction::new(OpCode::LoadConst, Some(Operand::Const(Value::Int(10))), 0);
        assert_eq!(load.const_value(), Some(&Value::Int(10)));
        assert_eq!(load.name(), None);
        assert_eq!(load.count(), None);

        let store = Instruction::new(OpCode::StoreName, Some(Operand::Name("a".into())), 2);
        assert_eq!(store.name(), Some("a"));
        assert_eq!(store.offset_arg(), None);

        let jump = Instruction::new(OpCode::JumpAbsolute, Some(Operand::Offset(8)), 4);
        assert_eq!(jump.offset_arg(), Some(8));
    }

    #[test]
    fn operand_shape() {
        assert!(Instruction::new(OpCode::Nop, None, 0).operand_matches());
        assert!(!Instruction::new(OpCode::Nop, Some(Operand::Count(1)), 0).operand_matches());
        assert!(!Instruction::new(OpCode::LoadConst, None, 0).operand_matches());
        assert!(!Instruction::new(OpCode::LoadName, Some(Operand::Count(1)), 0).operand_matches());
        assert!(Instruction::new(OpCode::SetupLoop, Some(Operand::Offset(6)), 0).operand_matches());
        assert!(
            Instruction::new(OpCode::PopJumpIfTrue, Some(Operand::Offset(6)), 0).operand_matches()
        );
    }

    #[test]
    fn call_args_unpack() {
        assert_eq!(
            CallArgs::from_count(3),
            Some(CallArgs {
                positional: 3,
                keyword: 0
            })
        );
        assert_eq!(
            CallArgs::from_count(0x0201),
            Some(CallArgs {
                positional: 1,
                keyword: 2
            })
        );
        assert_eq!(
            CallArgs::from_count(0xffff),
            Some(CallArgs {
                positional: 255,
                keyword: 255
            })
        );
    }

    #[test]
    fn call_args_reject_high_bits() {
        assert_eq!(CallArgs::from_count(0x1_0001), None);
        assert_eq!(CallArgs::from_count(u32::MAX), None);
    }

    #[test]
    fn display() {
        let load = Instruction::new(OpCode::LoadConst, Some(Operand::Const(Value::from("hoge"))), 12);
        assert_eq!(load.to_string(), "  12 LOAD_CONST 'hoge'");
        assert_eq!(Instruction::new(OpCode::PopTop, None, 0).to_string(), "   0 POP_TOP");
    }
}
