//! pyvm assembler: text listings ⇄ instruction streams.
//!
//! A listing has one instruction per line, `[offset] MNEMONIC [operand]`.
//! Offsets may be omitted, in which case they continue from the previous
//! instruction in steps of [`INSTRUCTION_SIZE`](pyvm_common::INSTRUCTION_SIZE).
//! Interpreted functions are written as `.func name params...` / `.end`
//! blocks and referenced from LOAD_CONST as `@name` once defined.
//!
//! # Usage
//!
//! ```
//! use pyvm_assembler::{assemble, disassemble};
//!
//! let text = "0 LOAD_CONST 42\n2 RETURN_VALUE\n";
//! let stream = assemble(text).unwrap();
//! assert_eq!(stream.len(), 2);
//! assert_eq!(disassemble(&stream), text);
//! ```
//!
//! # Roundtrip Guarantee
//!
//! `assemble(disassemble(stream)) == stream` holds for every stream whose
//! constants have listing syntax. The disassembler outputs canonical text;
//! the assembler also accepts non-canonical input (implicit offsets,
//! lower-case mnemonics, comments, nested `.func` blocks).

pub mod error;

mod disassembler;
mod lexer;
mod parser;

pub use error::AsmError;

use lexer::tokenize_line;
use parser::{parse_line, FunctionTable, Line};
use pyvm_common::{Function, Instruction, InstructionStream, OpCode, Operand, Value, INSTRUCTION_SIZE};

/// An open `.func` block.
struct Header {
    name: String,
    params: Vec<String>,
    line: usize,
}

/// Instructions collected for the top level or one function body.
struct Block {
    header: Option<Header>,
    instructions: Vec<Instruction>,
    previous: Option<u32>,
}

impl Block {
    fn new(header: Option<Header>) -> Self {
        Self {
            header,
            instructions: Vec::new(),
            previous: None,
        }
    }

    fn push(
        &mut self,
        line: usize,
        offset: Option<u32>,
        opcode: OpCode,
        operand: Option<Operand>,
    ) -> Result<(), AsmError> {
        let offset = match (offset, self.previous) {
            (Some(offset), Some(previous)) if offset <= previous => {
                return Err(AsmError::NonMonotonicOffset {
                    line,
                    offset,
                    previous,
                })
            }
            (Some(offset), _) => offset,
            (None, None) => 0,
            (None, Some(previous)) => {
                previous
                    .checked_add(INSTRUCTION_SIZE)
                    .ok_or_else(|| AsmError::InvalidNumber {
                        line,
                        token: format!("{previous}+{INSTRUCTION_SIZE}"),
                    })?
            }
        };
        self.previous = Some(offset);
        self.instructions
            .push(Instruction::new(opcode, operand, offset));
        Ok(())
    }
}

/// Assemble a listing into an instruction stream.
///
/// Returns the first error encountered. The stream is not validated;
/// use [`InstructionStream::validate`] for jump targets and operand shapes.
pub fn assemble(text: &str) -> Result<InstructionStream, AsmError> {
    let mut functions = FunctionTable::new();
    let mut blocks = vec![Block::new(None)];

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let tokens = tokenize_line(line, line_num)?;
        let Some(parsed) = parse_line(&tokens, line_num, &functions)? else {
            continue;
        };
        match parsed {
            Line::Instruction {
                offset,
                opcode,
                operand,
            } => {
                if let Some(block) = blocks.last_mut() {
                    block.push(line_num, offset, opcode, operand)?;
                }
            }
            Line::Func { name, params } => {
                let open = blocks
                    .iter()
                    .filter_map(|b| b.header.as_ref())
                    .any(|h| h.name == name);
                if open || functions.contains_key(&name) {
                    return Err(AsmError::DuplicateFunction {
                        line: line_num,
                        name,
                    });
                }
                blocks.push(Block::new(Some(Header {
                    name,
                    params,
                    line: line_num,
                })));
            }
            Line::End => {
                let (header, instructions) = match blocks.pop() {
                    Some(Block {
                        header: Some(header),
                        instructions,
                        ..
                    }) => (header, instructions),
                    _ => return Err(AsmError::UnmatchedEnd { line: line_num }),
                };
                let function = Function::new(
                    header.name.clone(),
                    header.params,
                    InstructionStream::new(instructions),
                );
                functions.insert(header.name, Value::from(function));
            }
        }
    }

    match blocks.pop() {
        Some(Block {
            header: Some(header),
            ..
        }) => Err(AsmError::UnterminatedFunction {
            line: header.line,
            name: header.name,
        }),
        Some(top) => Ok(InstructionStream::new(top.instructions)),
        None => Ok(InstructionStream::default()),
    }
}

/// Disassemble an instruction stream into canonical listing text.
///
/// Offsets are always explicit. Function constants are emitted as
/// `.func` blocks ahead of the code that references them.
pub fn disassemble(stream: &InstructionStream) -> String {
    disassembler::disassemble(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyvm_common::Callable;

    #[test]
    fn assemble_minimal() {
        let stream = assemble("LOAD_CONST 42\nRETURN_VALUE\n").unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.instructions()[0].opcode, OpCode::LoadConst);
        assert_eq!(stream.instructions()[0].const_value(), Some(&Value::Int(42)));
        assert_eq!(stream.instructions()[1].offset, 2);
    }

    #[test]
    fn implicit_offsets_continue_from_explicit_ones() {
        let stream = assemble("10 NOP\nNOP\n20 NOP\nNOP\n").unwrap();
        let offsets: Vec<u32> = stream.iter().map(|i| i.offset).collect();
        assert_eq!(offsets, vec![10, 12, 20, 22]);
    }

    #[test]
    fn offsets_must_increase() {
        assert_eq!(
            assemble("4 NOP\n4 NOP\n").unwrap_err(),
            AsmError::NonMonotonicOffset {
                line: 2,
                offset: 4,
                previous: 4
            }
        );
        assert!(matches!(
            assemble("NOP\nNOP\n0 NOP\n").unwrap_err(),
            AsmError::NonMonotonicOffset { line: 3, .. }
        ));
    }

    #[test]
    fn function_bodies_count_offsets_from_zero() {
        let text = "\
0 NOP
.func f
    LOAD_CONST None
    RETURN_VALUE
.end
LOAD_CONST @f
";
        let stream = assemble(text).unwrap();
        assert_eq!(stream.instructions()[1].offset, 2);
        let Some(Value::Callable(Callable::Interpreted(f))) = stream.instructions()[1].const_value()
        else {
            panic!("expected a function constant");
        };
        assert_eq!(f.code.instructions()[0].offset, 0);
        assert_eq!(f.code.instructions()[1].offset, 2);
    }

    #[test]
    fn nested_functions_are_visible_after_their_end() {
        let text = "\
.func outer
    .func inner
        LOAD_CONST 1
        RETURN_VALUE
    .end
    LOAD_CONST @inner
    RETURN_VALUE
.end
LOAD_CONST @outer
LOAD_CONST @inner
";
        let stream = assemble(text).unwrap();
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn function_must_be_defined_before_use() {
        let text = "\
LOAD_CONST @later
.func later
.end
";
        assert_eq!(
            assemble(text).unwrap_err(),
            AsmError::UnknownFunction {
                line: 1,
                name: "later".to_string()
            }
        );
    }

    #[test]
    fn recursive_reference_inside_own_body_is_unknown() {
        let text = "\
.func f
    LOAD_CONST @f
.end
";
        assert!(matches!(
            assemble(text).unwrap_err(),
            AsmError::UnknownFunction { line: 2, .. }
        ));
    }

    #[test]
    fn block_errors() {
        assert_eq!(
            assemble("NOP\n.end\n").unwrap_err(),
            AsmError::UnmatchedEnd { line: 2 }
        );
        assert_eq!(
            assemble("NOP\n.func f\nNOP\n").unwrap_err(),
            AsmError::UnterminatedFunction {
                line: 2,
                name: "f".to_string()
            }
        );
        assert_eq!(
            assemble(".func f\n.end\n.func f\n.end\n").unwrap_err(),
            AsmError::DuplicateFunction {
                line: 3,
                name: "f".to_string()
            }
        );
        assert!(matches!(
            assemble(".func f\n.func f\n.end\n.end\n").unwrap_err(),
            AsmError::DuplicateFunction { line: 2, .. }
        ));
    }

    #[test]
    fn error_reports_correct_line() {
        let err = assemble("NOP\n\n; comment\nFOOBAR\n").unwrap_err();
        assert_eq!(err.line(), 4);
        assert!(matches!(err, AsmError::UnknownOpcode { .. }));
    }

    #[test]
    fn roundtrip_canonical_text() {
        let text = "\
.func add x y
    0 LOAD_NAME x
    2 LOAD_NAME y
    4 BINARY_ADD
    6 RETURN_VALUE
.end
0 LOAD_CONST @add
2 LOAD_CONST (1, 2.5, 'a\\'b')
4 POP_TOP
6 LOAD_CONST 2
8 LOAD_CONST 3
10 CALL_FUNCTION 2
12 RETURN_VALUE
";
        let stream = assemble(text).unwrap();
        assert_eq!(disassemble(&stream), text);
    }

    #[test]
    fn roundtrip_assemble_then_disassemble_then_assemble() {
        let text = "\
; implicit offsets and lower-case mnemonics
load_const 1.0
store_name a
  load_name a
return_value
";
        let first = assemble(text).unwrap();
        let canonical = disassemble(&first);
        let second = assemble(&canonical).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            canonical,
            "0 LOAD_CONST 1.0\n2 STORE_NAME a\n4 LOAD_NAME a\n6 RETURN_VALUE\n"
        );
    }

    #[test]
    fn every_opcode_roundtrips() {
        for opcode in pyvm_common::opcode::ALL_OPCODES {
            let operand = match opcode.operand_kind() {
                pyvm_common::OperandKind::None => "",
                pyvm_common::OperandKind::Const => " None",
                pyvm_common::OperandKind::Name => " x",
                _ => " 0",
            };
            let text = format!("0 {}{operand}\n", opcode.mnemonic());
            let stream = assemble(&text).unwrap();
            assert_eq!(stream.instructions()[0].opcode, opcode);
            assert_eq!(disassemble(&stream), text, "{opcode}");
        }
    }
}
