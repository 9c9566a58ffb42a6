//! Parser for listing tokens → instructions and directives.
//!
//! Dispatches on the opcode's operand shape: none, a constant literal,
//! a name, a count, or a jump offset.

use std::collections::HashMap;

use crate::error::AsmError;
use crate::lexer::Token;
use pyvm_common::{OpCode, Operand, OperandKind, Value};

/// Functions defined so far, by name.
pub(crate) type FunctionTable = HashMap<String, Value>;

/// One parsed listing line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Line {
    /// An instruction, with its explicit offset if one was written.
    Instruction {
        offset: Option<u32>,
        opcode: OpCode,
        operand: Option<Operand>,
    },
    /// `.func name params...`
    Func { name: String, params: Vec<String> },
    /// `.end`
    End,
}

/// Tokens of one line with a read position.
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    line: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, token: &Token) -> AsmError {
        AsmError::UnexpectedToken {
            line: self.line,
            token: token.to_string(),
        }
    }

    fn missing(&self, opcode: &'static str, expected: &'static str) -> AsmError {
        AsmError::MissingArgument {
            line: self.line,
            opcode,
            expected,
        }
    }

    /// Check that there are no extra tokens.
    fn expect_end(&self) -> Result<(), AsmError> {
        match self.peek() {
            Some(token) => Err(self.unexpected(token)),
            None => Ok(()),
        }
    }

    /// A non-negative integer that fits in 32 bits.
    fn expect_u32(&mut self, opcode: &'static str, expected: &'static str) -> Result<u32, AsmError> {
        match self.next() {
            Some(Token::Int(n)) => u32::try_from(*n).map_err(|_| AsmError::InvalidNumber {
                line: self.line,
                token: n.to_string(),
            }),
            Some(other) => Err(self.unexpected(other)),
            None => Err(self.missing(opcode, expected)),
        }
    }
}

/// Parse the tokens of a single line.
///
/// Returns `Ok(None)` for blank lines (empty token list). `@name`
/// constants are resolved against `functions`.
pub(crate) fn parse_line(
    tokens: &[Token],
    line_num: usize,
    functions: &FunctionTable,
) -> Result<Option<Line>, AsmError> {
    let mut cur = Cursor::new(tokens, line_num);
    let Some(first) = cur.peek() else {
        return Ok(None);
    };

    if let Token::Directive(directive) = first {
        cur.next();
        return parse_directive(directive, &mut cur).map(Some);
    }

    let offset = match first {
        Token::Int(_) => Some(cur.expect_u32("offset", "a number")?),
        _ => None,
    };

    let mnemonic = match cur.next() {
        Some(Token::Ident(s)) => s,
        Some(other) => return Err(cur.unexpected(other)),
        None => return Err(cur.missing("instruction", "an opcode")),
    };
    let opcode =
        OpCode::from_mnemonic(&mnemonic.to_ascii_uppercase()).ok_or_else(|| {
            AsmError::UnknownOpcode {
                line: line_num,
                token: mnemonic.clone(),
            }
        })?;

    let name = opcode.mnemonic();
    let operand = match opcode.operand_kind() {
        OperandKind::None => None,
        OperandKind::Const => Some(Operand::Const(parse_const(&mut cur, functions)?)),
        OperandKind::Name => match cur.next() {
            Some(Token::Ident(s)) => Some(Operand::Name(s.clone())),
            Some(other) => return Err(cur.unexpected(other)),
            None => return Err(cur.missing(name, "a name")),
        },
        OperandKind::Count => Some(Operand::Count(cur.expect_u32(name, "a count")?)),
        OperandKind::RelativeJump | OperandKind::AbsoluteJump => {
            Some(Operand::Offset(cur.expect_u32(name, "an offset")?))
        }
    };
    cur.expect_end()?;

    Ok(Some(Line::Instruction {
        offset,
        opcode,
        operand,
    }))
}

fn parse_directive(directive: &str, cur: &mut Cursor<'_>) -> Result<Line, AsmError> {
    match directive {
        "func" => {
            let name = match cur.next() {
                Some(Token::Ident(s)) => s.clone(),
                Some(other) => return Err(cur.unexpected(other)),
                None => return Err(cur.missing(".func", "a function name")),
            };
            let mut params = Vec::new();
            while let Some(token) = cur.next() {
                match token {
                    Token::Ident(p) => params.push(p.clone()),
                    other => return Err(cur.unexpected(other)),
                }
            }
            Ok(Line::Func { name, params })
        }
        "end" => {
            cur.expect_end()?;
            Ok(Line::End)
        }
        other => Err(AsmError::UnexpectedToken {
            line: cur.line,
            token: format!(".{other}"),
        }),
    }
}

/// A LOAD_CONST literal: number, string, keyword, `@name`, or tuple.
fn parse_const(cur: &mut Cursor<'_>, functions: &FunctionTable) -> Result<Value, AsmError> {
    let token = cur
        .next()
        .ok_or_else(|| cur.missing("LOAD_CONST", "a constant"))?;
    match token {
        Token::Int(n) => Ok(Value::Int(*n)),
        Token::Float(x) => Ok(Value::Float(*x)),
        Token::Str(s) => Ok(Value::from(s.as_str())),
        Token::Ident(word) => match word.as_str() {
            "None" => Ok(Value::None),
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "inf" | "nan" | "NaN" => word
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| cur.unexpected(token)),
            _ => Err(cur.unexpected(token)),
        },
        Token::FuncRef(name) => {
            functions
                .get(name)
                .cloned()
                .ok_or_else(|| AsmError::UnknownFunction {
                    line: cur.line,
                    name: name.clone(),
                })
        }
        Token::LParen => parse_tuple(cur, functions),
        other => Err(cur.unexpected(other)),
    }
}

/// The rest of a tuple literal after `(`.
fn parse_tuple(cur: &mut Cursor<'_>, functions: &FunctionTable) -> Result<Value, AsmError> {
    let mut items = Vec::new();
    loop {
        if let Some(Token::RParen) = cur.peek() {
            cur.next();
            break;
        }
        items.push(parse_const(cur, functions)?);
        match cur.next() {
            Some(Token::Comma) => {}
            Some(Token::RParen) => break,
            Some(other) => return Err(cur.unexpected(other)),
            None => return Err(cur.missing("LOAD_CONST", "')'")),
        }
    }
    Ok(Value::tuple(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_line;
    use pyvm_common::{Function, InstructionStream};

    fn parse(text: &str) -> Result<Option<Line>, AsmError> {
        parse_with(text, &FunctionTable::new())
    }

    fn parse_with(text: &str, functions: &FunctionTable) -> Result<Option<Line>, AsmError> {
        let tokens = tokenize_line(text, 1)?;
        parse_line(&tokens, 1, functions)
    }

    fn instr(offset: Option<u32>, opcode: OpCode, operand: Option<Operand>) -> Option<Line> {
        Some(Line::Instruction {
            offset,
            opcode,
            operand,
        })
    }

    #[test]
    fn parse_blank_line() {
        assert_eq!(parse("   ; nothing").unwrap(), None);
    }

    #[test]
    fn parse_bare_opcode() {
        assert_eq!(
            parse("BINARY_ADD").unwrap(),
            instr(None, OpCode::BinaryAdd, None)
        );
    }

    #[test]
    fn parse_explicit_offset() {
        assert_eq!(
            parse("12 RETURN_VALUE").unwrap(),
            instr(Some(12), OpCode::ReturnValue, None)
        );
    }

    #[test]
    fn mnemonics_are_case_insensitive() {
        assert_eq!(
            parse("pop_top").unwrap(),
            instr(None, OpCode::PopTop, None)
        );
    }

    #[test]
    fn names_keep_their_case() {
        assert_eq!(
            parse("load_name MyName").unwrap(),
            instr(
                None,
                OpCode::LoadName,
                Some(Operand::Name("MyName".to_string()))
            )
        );
    }

    #[test]
    fn parse_const_literals() {
        let cases = [
            ("LOAD_CONST 10", Value::Int(10)),
            ("LOAD_CONST -4", Value::Int(-4)),
            ("LOAD_CONST 10.55", Value::Float(10.55)),
            ("LOAD_CONST 'hoge'", Value::from("hoge")),
            ("LOAD_CONST None", Value::None),
            ("LOAD_CONST True", Value::Bool(true)),
            ("LOAD_CONST False", Value::Bool(false)),
            ("LOAD_CONST inf", Value::Float(f64::INFINITY)),
        ];
        for (text, value) in cases {
            assert_eq!(
                parse(text).unwrap(),
                instr(None, OpCode::LoadConst, Some(Operand::Const(value))),
                "{text}"
            );
        }
    }

    #[test]
    fn parse_tuple_literals() {
        let cases = [
            ("LOAD_CONST ()", Value::tuple(vec![])),
            ("LOAD_CONST (1,)", Value::tuple(vec![Value::Int(1)])),
            (
                "LOAD_CONST (1, ('a', None))",
                Value::tuple(vec![
                    Value::Int(1),
                    Value::tuple(vec![Value::from("a"), Value::None]),
                ]),
            ),
        ];
        for (text, value) in cases {
            assert_eq!(
                parse(text).unwrap(),
                instr(None, OpCode::LoadConst, Some(Operand::Const(value))),
                "{text}"
            );
        }
    }

    #[test]
    fn unclosed_tuple() {
        assert_eq!(
            parse("LOAD_CONST (1, 2").unwrap_err(),
            AsmError::MissingArgument {
                line: 1,
                opcode: "LOAD_CONST",
                expected: "')'"
            }
        );
    }

    #[test]
    fn unknown_keyword_constant() {
        assert_eq!(
            parse("LOAD_CONST none").unwrap_err(),
            AsmError::UnexpectedToken {
                line: 1,
                token: "none".to_string()
            }
        );
    }

    #[test]
    fn function_reference_resolves() {
        let function = Value::from(Function::new("f", vec![], InstructionStream::default()));
        let mut functions = FunctionTable::new();
        functions.insert("f".to_string(), function.clone());
        assert_eq!(
            parse_with("LOAD_CONST @f", &functions).unwrap(),
            instr(None, OpCode::LoadConst, Some(Operand::Const(function)))
        );
        assert_eq!(
            parse("LOAD_CONST @g").unwrap_err(),
            AsmError::UnknownFunction {
                line: 1,
                name: "g".to_string()
            }
        );
    }

    #[test]
    fn parse_counts_and_offsets() {
        assert_eq!(
            parse("CALL_FUNCTION 2").unwrap(),
            instr(None, OpCode::CallFunction, Some(Operand::Count(2)))
        );
        assert_eq!(
            parse("6 JUMP_ABSOLUTE 0").unwrap(),
            instr(Some(6), OpCode::JumpAbsolute, Some(Operand::Offset(0)))
        );
    }

    #[test]
    fn negative_count_is_invalid() {
        assert_eq!(
            parse("BUILD_LIST -1").unwrap_err(),
            AsmError::InvalidNumber {
                line: 1,
                token: "-1".to_string()
            }
        );
    }

    #[test]
    fn missing_operands() {
        assert_eq!(
            parse("LOAD_NAME").unwrap_err(),
            AsmError::MissingArgument {
                line: 1,
                opcode: "LOAD_NAME",
                expected: "a name"
            }
        );
        assert_eq!(
            parse("SETUP_LOOP").unwrap_err(),
            AsmError::MissingArgument {
                line: 1,
                opcode: "SETUP_LOOP",
                expected: "an offset"
            }
        );
        assert_eq!(
            parse("LOAD_CONST").unwrap_err(),
            AsmError::MissingArgument {
                line: 1,
                opcode: "LOAD_CONST",
                expected: "a constant"
            }
        );
    }

    #[test]
    fn offset_without_opcode() {
        assert!(matches!(
            parse("4").unwrap_err(),
            AsmError::MissingArgument {
                expected: "an opcode",
                ..
            }
        ));
    }

    #[test]
    fn extra_tokens_rejected() {
        assert_eq!(
            parse("POP_TOP 5").unwrap_err(),
            AsmError::UnexpectedToken {
                line: 1,
                token: "5".to_string()
            }
        );
    }

    #[test]
    fn unknown_opcode_keeps_spelling() {
        assert_eq!(
            parse("frobnicate").unwrap_err(),
            AsmError::UnknownOpcode {
                line: 1,
                token: "frobnicate".to_string()
            }
        );
    }

    #[test]
    fn parse_directives() {
        assert_eq!(
            parse(".func add x y").unwrap(),
            Some(Line::Func {
                name: "add".to_string(),
                params: vec!["x".to_string(), "y".to_string()],
            })
        );
        assert_eq!(
            parse(".func noargs").unwrap(),
            Some(Line::Func {
                name: "noargs".to_string(),
                params: vec![],
            })
        );
        assert_eq!(parse(".end").unwrap(), Some(Line::End));
        assert_eq!(
            parse(".loop").unwrap_err(),
            AsmError::UnexpectedToken {
                line: 1,
                token: ".loop".to_string()
            }
        );
        assert!(matches!(
            parse(".func").unwrap_err(),
            AsmError::MissingArgument { opcode: ".func", .. }
        ));
    }
}
