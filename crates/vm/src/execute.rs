//! Main execution loop and opcode dispatch.

use pyvm_common::{BinaryOp, Instruction, OpCode, UnaryOp, Value};

use crate::error::RuntimeError;
use crate::machine::{Frame, LoopBlock, Step};

impl<'a> Frame<'a> {
    /// Run until RETURN_VALUE or the end of the stream.
    ///
    /// Falling off the end yields `None`.
    #[tracing::instrument(level = "debug", skip_all, fields(depth = self.depth, len = self.code.len()))]
    pub fn eval(&mut self) -> Result<Value, RuntimeError> {
        loop {
            match self.step() {
                Ok(Step::Continue) => {}
                Ok(Step::Return(value)) => {
                    tracing::debug!(result = %value, "frame returned");
                    return Ok(value);
                }
                Err(err) => {
                    tracing::debug!(error = %err, "frame aborted");
                    return Err(err);
                }
            }
        }
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        let Some(instr) = self.fetch() else {
            return Ok(Step::Return(Value::None));
        };
        self.current = self.pc;
        self.pc += 1;

        tracing::trace!(
            pc = self.current,
            offset = instr.offset,
            op = instr.opcode.mnemonic(),
            stack = self.stack.len(),
            "dispatch"
        );

        match instr.opcode {
            OpCode::Nop => {}

            // Stack shuffles
            OpCode::PopTop => {
                self.pop()?;
            }
            OpCode::RotTwo => {
                let top = self.pop()?;
                let second = self.pop()?;
                self.push(top);
                self.push(second);
            }
            OpCode::RotThree => {
                let top = self.pop()?;
                let second = self.pop()?;
                let third = self.pop()?;
                self.push(top);
                self.push(third);
                self.push(second);
            }
            OpCode::DupTop => {
                let top = self.peek(0)?.clone();
                self.push(top);
            }
            OpCode::DupTopTwo => {
                let second = self.peek(1)?.clone();
                let top = self.peek(0)?.clone();
                self.push(second);
                self.push(top);
            }

            // Unary
            OpCode::UnaryPositive => self.exec_unary(UnaryOp::Positive)?,
            OpCode::UnaryNegative => self.exec_unary(UnaryOp::Negative)?,
            OpCode::UnaryNot => self.exec_unary(UnaryOp::Not)?,
            OpCode::UnaryInvert => self.exec_unary(UnaryOp::Invert)?,

            // Iteration
            OpCode::GetIter => self.exec_get_iter(false)?,
            OpCode::GetYieldFromIter => self.exec_get_iter(true)?,

            // Binary
            OpCode::BinaryPower => self.exec_binary(BinaryOp::Power)?,
            OpCode::BinaryMultiply => self.exec_binary(BinaryOp::Multiply)?,
            OpCode::BinaryMatrixMultiply => self.exec_binary(BinaryOp::MatrixMultiply)?,
            OpCode::BinaryFloorDivide => self.exec_binary(BinaryOp::FloorDivide)?,
            OpCode::BinaryTrueDivide => self.exec_binary(BinaryOp::TrueDivide)?,
            OpCode::BinaryModulo => self.exec_binary(BinaryOp::Modulo)?,
            OpCode::BinaryAdd => self.exec_binary(BinaryOp::Add)?,
            OpCode::BinarySubtract => self.exec_binary(BinaryOp::Subtract)?,
            OpCode::BinarySubscr => self.exec_binary(BinaryOp::Subscript)?,
            OpCode::BinaryLshift => self.exec_binary(BinaryOp::LeftShift)?,
            OpCode::BinaryRshift => self.exec_binary(BinaryOp::RightShift)?,
            OpCode::BinaryAnd => self.exec_binary(BinaryOp::And)?,
            OpCode::BinaryXor => self.exec_binary(BinaryOp::Xor)?,
            OpCode::BinaryOr => self.exec_binary(BinaryOp::Or)?,

            // Names and constants
            OpCode::ReturnValue => return Ok(Step::Return(self.pop()?)),
            OpCode::LoadConst => {
                let value = instr.const_value().ok_or_else(|| self.missing_operand(instr))?;
                self.push(value.clone());
            }
            OpCode::LoadName => {
                let value = self.resolve(self.name_operand(instr)?)?;
                self.push(value);
            }
            OpCode::StoreName => {
                let name = self.name_operand(instr)?;
                let value = self.pop()?;
                self.bind(name, value);
            }

            // Control flow
            OpCode::PopJumpIfTrue => self.exec_pop_jump_if(instr, true)?,
            OpCode::PopJumpIfFalse => self.exec_pop_jump_if(instr, false)?,
            OpCode::JumpForward | OpCode::JumpAbsolute | OpCode::ContinueLoop => {
                self.pc = self.jump_index(instr)?;
            }

            // Loop blocks
            OpCode::SetupLoop => {
                let end_pc = self.jump_index(instr)?;
                self.blocks.push(LoopBlock {
                    start_pc: self.pc,
                    end_pc,
                    stack_level: self.stack.len(),
                });
            }
            OpCode::PopBlock => {
                self.pop_block()?;
            }
            OpCode::BreakLoop => {
                let block = self.pop_block()?;
                self.stack.truncate(block.stack_level);
                self.pc = block.end_pc;
            }

            // Containers and calls
            OpCode::BuildList => {
                let items = self.pop_count(instr)?;
                self.push(Value::list(items));
            }
            OpCode::BuildTuple => {
                let items = self.pop_count(instr)?;
                self.push(Value::tuple(items));
            }
            OpCode::BuildSet => {
                let items = self.pop_count(instr)?;
                let set = Value::set(items).map_err(|e| RuntimeError::from_op(self.current, e))?;
                self.push(set);
            }
            OpCode::CallFunction => self.exec_call(instr)?,

            OpCode::CompareOp
            | OpCode::StoreSubscr
            | OpCode::ForIter
            | OpCode::UnpackSequence
            | OpCode::BuildMap
            | OpCode::LoadAttr
            | OpCode::LoadGlobal
            | OpCode::StoreGlobal
            | OpCode::DeleteName
            | OpCode::MakeFunction
            | OpCode::YieldValue
            | OpCode::SetupExcept
            | OpCode::InplaceAdd
            | OpCode::PrintExpr => {
                return Err(RuntimeError::UnsupportedOpcode {
                    at: self.current,
                    opcode: instr.opcode,
                })
            }
        }

        Ok(Step::Continue)
    }

    fn exec_unary(&mut self, op: UnaryOp) -> Result<(), RuntimeError> {
        let operand = self.pop()?;
        let result = operand
            .unary(op)
            .map_err(|e| RuntimeError::from_op(self.current, e))?;
        self.push(result);
        Ok(())
    }

    /// Pop right then left, push `left op right`.
    fn exec_binary(&mut self, op: BinaryOp) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = left
            .binary(op, &right)
            .map_err(|e| RuntimeError::from_op(self.current, e))?;
        self.push(result);
        Ok(())
    }

    /// GET_ITER, or GET_YIELD_FROM_ITER when `pass_through_generators`.
    fn exec_get_iter(&mut self, pass_through_generators: bool) -> Result<(), RuntimeError> {
        let value = self.pop()?;
        if pass_through_generators && value.is_generator_like() {
            self.push(value);
            return Ok(());
        }
        let iter = value
            .iter()
            .map_err(|e| RuntimeError::from_op(self.current, e))?;
        self.push(iter);
        Ok(())
    }

    fn exec_pop_jump_if(&mut self, instr: &Instruction, when: bool) -> Result<(), RuntimeError> {
        let condition = self.pop()?;
        if condition.is_truthy() == when {
            self.pc = self.jump_index(instr)?;
        }
        Ok(())
    }

    fn pop_block(&mut self) -> Result<LoopBlock, RuntimeError> {
        self.blocks
            .pop()
            .ok_or(RuntimeError::BlockUnderflow { at: self.current })
    }

    fn pop_count(&mut self, instr: &Instruction) -> Result<Vec<Value>, RuntimeError> {
        let n = instr.count().ok_or_else(|| self.missing_operand(instr))?;
        self.pop_n(n as usize)
    }

    fn name_operand<'i>(&self, instr: &'i Instruction) -> Result<&'i str, RuntimeError> {
        instr.name().ok_or_else(|| self.missing_operand(instr))
    }

    /// Index of the instruction the jump at `current` lands on.
    pub(crate) fn jump_index(&self, instr: &Instruction) -> Result<usize, RuntimeError> {
        if let Some(index) = self.code.resolve_jump(self.current) {
            return Ok(index);
        }
        match self.code.jump_target(self.current) {
            Some(target) => Err(RuntimeError::InvalidJumpTarget {
                at: self.current,
                target,
            }),
            None => Err(self.missing_operand(instr)),
        }
    }

    pub(crate) fn missing_operand(&self, instr: &Instruction) -> RuntimeError {
        RuntimeError::MissingOperand {
            at: self.current,
            opcode: instr.opcode,
        }
    }
}
