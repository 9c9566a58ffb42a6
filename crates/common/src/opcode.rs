//! Opcode definitions for the pyvm instruction set.
//!
//! The set mirrors the stack-machine wordcode an external compiler emits.
//! Every opcode is known to the assembler and the validator; only the ones
//! the execution core implements are dispatched; the rest fail at run time
//! with an unsupported-opcode error naming the mnemonic.

/// The operand shape an opcode requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// No operand.
    None,
    /// A literal value pushed as-is.
    Const,
    /// A name looked up in (or bound to) a scope.
    Name,
    /// An element or argument count.
    Count,
    /// A byte delta relative to the following instruction.
    RelativeJump,
    /// An absolute byte offset.
    AbsoluteJump,
}

/// Identifies the operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // General
    /// Do nothing.
    Nop,
    /// Discard the top of stack.
    PopTop,
    /// Swap the two topmost items.
    RotTwo,
    /// Lift the second and third items one position up, move top down to third.
    RotThree,
    /// Duplicate the top of stack.
    DupTop,
    /// Duplicate the two topmost items, keeping their order.
    DupTopTwo,

    // Unary
    /// `+x`
    UnaryPositive,
    /// `-x`
    UnaryNegative,
    /// `not x`
    UnaryNot,
    /// `~x`
    UnaryInvert,

    // Iteration
    /// Replace the top of stack with an iterator over it.
    GetIter,
    /// Like `GetIter`, but leaves generator-like values untouched.
    GetYieldFromIter,

    // Binary
    /// `a ** b`
    BinaryPower,
    /// `a * b`
    BinaryMultiply,
    /// `a @ b` (reserved, unsupported for every operand pair).
    BinaryMatrixMultiply,
    /// `a // b`
    BinaryFloorDivide,
    /// `a / b`
    BinaryTrueDivide,
    /// `a % b`
    BinaryModulo,
    /// `a + b`
    BinaryAdd,
    /// `a - b`
    BinarySubtract,
    /// `a[b]`
    BinarySubscr,
    /// `a << b`
    BinaryLshift,
    /// `a >> b`
    BinaryRshift,
    /// `a & b`
    BinaryAnd,
    /// `a ^ b`
    BinaryXor,
    /// `a | b`
    BinaryOr,

    // Names and constants
    /// Return the top of stack from the current frame.
    ReturnValue,
    /// Push the literal operand.
    LoadConst,
    /// Resolve a name through the scope chain and push it.
    LoadName,
    /// Pop and bind to a local name.
    StoreName,

    // Control flow
    /// Pop; jump to an absolute offset if truthy.
    PopJumpIfTrue,
    /// Pop; jump to an absolute offset if falsy.
    PopJumpIfFalse,
    /// Jump by a delta relative to the following instruction.
    JumpForward,
    /// Jump to an absolute offset.
    JumpAbsolute,

    // Loop blocks
    /// Push a loop block ending at a relative offset.
    SetupLoop,
    /// Pop the innermost loop block.
    PopBlock,
    /// Leave the innermost loop block, continuing at its end.
    BreakLoop,
    /// Jump back to the start of the innermost loop.
    ContinueLoop,

    // Containers and calls
    /// Collect `n` items into a list.
    BuildList,
    /// Collect `n` items into a tuple.
    BuildTuple,
    /// Collect `n` items into a set.
    BuildSet,
    /// Call a callable with the packed argument counts.
    CallFunction,

    // Emitted by compilers, not implemented by this core.
    /// Rich comparison.
    CompareOp,
    /// `a[b] = c`
    StoreSubscr,
    /// Advance an iterator.
    ForIter,
    /// Unpack a sequence into `n` stack items.
    UnpackSequence,
    /// Build a dictionary.
    BuildMap,
    /// Attribute access.
    LoadAttr,
    /// Global-only lookup.
    LoadGlobal,
    /// Global-only binding.
    StoreGlobal,
    /// Remove a local binding.
    DeleteName,
    /// Build a function object at run time.
    MakeFunction,
    /// Generator suspension.
    YieldValue,
    /// Exception handler block.
    SetupExcept,
    /// `a += b`
    InplaceAdd,
    /// Interactive echo.
    PrintExpr,
}

/// All opcodes, in definition order. Useful for exhaustive testing.
pub const ALL_OPCODES: [OpCode; 56] = [
    OpCode::Nop,
    OpCode::PopTop,
    OpCode::RotTwo,
    OpCode::RotThree,
    OpCode::DupTop,
    OpCode::DupTopTwo,
    OpCode::UnaryPositive,
    OpCode::UnaryNegative,
    OpCode::UnaryNot,
    OpCode::UnaryInvert,
    OpCode::GetIter,
    OpCode::GetYieldFromIter,
    OpCode::BinaryPower,
    OpCode::BinaryMultiply,
    OpCode::BinaryMatrixMultiply,
    OpCode::BinaryFloorDivide,
    OpCode::BinaryTrueDivide,
    OpCode::BinaryModulo,
    OpCode::BinaryAdd,
    OpCode::BinarySubtract,
    OpCode::BinarySubscr,
    OpCode::BinaryLshift,
    OpCode::BinaryRshift,
    OpCode::BinaryAnd,
    OpCode::BinaryXor,
    OpCode::BinaryOr,
    OpCode::ReturnValue,
    OpCode::LoadConst,
    OpCode::LoadName,
    OpCode::StoreName,
    OpCode::PopJumpIfTrue,
    OpCode::PopJumpIfFalse,
    OpCode::JumpForward,
    OpCode::JumpAbsolute,
    OpCode::SetupLoop,
    OpCode::PopBlock,
    OpCode::BreakLoop,
    OpCode::ContinueLoop,
    OpCode::BuildList,
    OpCode::BuildTuple,
    OpCode::BuildSet,
    OpCode::CallFunction,
    OpCode::CompareOp,
    OpCode::StoreSubscr,
    OpCode::ForIter,
    OpCode::UnpackSequence,
    OpCode::BuildMap,
    OpCode::LoadAttr,
    OpCode::LoadGlobal,
    OpCode::StoreGlobal,
    OpCode::DeleteName,
    OpCode::MakeFunction,
    OpCode::YieldValue,
    OpCode::SetupExcept,
    OpCode::InplaceAdd,
    OpCode::PrintExpr,
];

impl OpCode {
    /// Returns the assembly mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Nop => "NOP",
            OpCode::PopTop => "POP_TOP",
            OpCode::RotTwo => "ROT_TWO",
            OpCode::RotThree => "ROT_THREE",
            OpCode::DupTop => "DUP_TOP",
            OpCode::DupTopTwo => "DUP_TOP_TWO",
            OpCode::UnaryPositive => "UNARY_POSITIVE",
            OpCode::UnaryNegative => "UNARY_NEGATIVE",
            OpCode::UnaryNot => "UNARY_NOT",
            OpCode::UnaryInvert => "UNARY_INVERT",
            OpCode::GetIter => "GET_ITER",
            OpCode::GetYieldFromIter => "GET_YIELD_FROM_ITER",
            OpCode::BinaryPower => "BINARY_POWER",
            OpCode::BinaryMultiply => "BINARY_MULTIPLY",
            OpCode::BinaryMatrixMultiply => "BINARY_MATRIX_MULTIPLY",
            OpCode::BinaryFloorDivide => "BINARY_FLOOR_DIVIDE",
            OpCode::BinaryTrueDivide => "BINARY_TRUE_DIVIDE",
            OpCode::BinaryModulo => "BINARY_MODULO",
            OpCode::BinaryAdd => "BINARY_ADD",
            OpCode::BinarySubtract => "BINARY_SUBTRACT",
            OpCode::BinarySubscr => "BINARY_SUBSCR",
            OpCode::BinaryLshift => "BINARY_LSHIFT",
            OpCode::BinaryRshift => "BINARY_RSHIFT",
            OpCode::BinaryAnd => "BINARY_AND",
            OpCode::BinaryXor => "BINARY_XOR",
            OpCode::BinaryOr => "BINARY_OR",
            OpCode::ReturnValue => "RETURN_VALUE",
            OpCode::LoadConst => "LOAD_CONST",
            OpCode::LoadName => "LOAD_NAME",
            OpCode::StoreName => "STORE_NAME",
            OpCode::PopJumpIfTrue => "POP_JUMP_IF_TRUE",
            OpCode::PopJumpIfFalse => "POP_JUMP_IF_FALSE",
            OpCode::JumpForward => "JUMP_FORWARD",
            OpCode::JumpAbsolute => "JUMP_ABSOLUTE",
            OpCode::SetupLoop => "SETUP_LOOP",
            OpCode::PopBlock => "POP_BLOCK",
            OpCode::BreakLoop => "BREAK_LOOP",
            OpCode::ContinueLoop => "CONTINUE_LOOP",
            OpCode::BuildList => "BUILD_LIST",
            OpCode::BuildTuple => "BUILD_TUPLE",
            OpCode::BuildSet => "BUILD_SET",
            OpCode::CallFunction => "CALL_FUNCTION",
            OpCode::CompareOp => "COMPARE_OP",
            OpCode::StoreSubscr => "STORE_SUBSCR",
            OpCode::ForIter => "FOR_ITER",
            OpCode::UnpackSequence => "UNPACK_SEQUENCE",
            OpCode::BuildMap => "BUILD_MAP",
            OpCode::LoadAttr => "LOAD_ATTR",
            OpCode::LoadGlobal => "LOAD_GLOBAL",
            OpCode::StoreGlobal => "STORE_GLOBAL",
            OpCode::DeleteName => "DELETE_NAME",
            OpCode::MakeFunction => "MAKE_FUNCTION",
            OpCode::YieldValue => "YIELD_VALUE",
            OpCode::SetupExcept => "SETUP_EXCEPT",
            OpCode::InplaceAdd => "INPLACE_ADD",
            OpCode::PrintExpr => "PRINT_EXPR",
        }
    }

    /// Look up an opcode by its (upper-case) mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        ALL_OPCODES
            .iter()
            .find(|op| op.mnemonic() == mnemonic)
            .copied()
    }

    /// Returns the operand shape this opcode requires.
    pub fn operand_kind(&self) -> OperandKind {
        match self {
            OpCode::LoadConst => OperandKind::Const,

            OpCode::LoadName
            | OpCode::StoreName
            | OpCode::LoadAttr
            | OpCode::LoadGlobal
            | OpCode::StoreGlobal
            | OpCode::DeleteName => OperandKind::Name,

            OpCode::BuildList
            | OpCode::BuildTuple
            | OpCode::BuildSet
            | OpCode::CallFunction
            | OpCode::CompareOp
            | OpCode::UnpackSequence
            | OpCode::BuildMap
            | OpCode::MakeFunction => OperandKind::Count,

            OpCode::JumpForward | OpCode::SetupLoop | OpCode::ForIter | OpCode::SetupExcept => {
                OperandKind::RelativeJump
            }

            OpCode::JumpAbsolute
            | OpCode::PopJumpIfTrue
            | OpCode::PopJumpIfFalse
            | OpCode::ContinueLoop => OperandKind::AbsoluteJump,

            _ => OperandKind::None,
        }
    }

    /// Returns true if the operand of this opcode is a jump target.
    pub fn is_jump(&self) -> bool {
        matches!(
            self.operand_kind(),
            OperandKind::RelativeJump | OperandKind::AbsoluteJump
        )
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
