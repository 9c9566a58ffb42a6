//! Disassembler: instruction stream → canonical listing text.
//!
//! Every instruction line carries its explicit offset. Interpreted
//! functions referenced by LOAD_CONST are emitted first as `.func` blocks
//! with a 4-space indented body, innermost first, each one once.

use std::collections::HashSet;

use pyvm_common::{Callable, Function, Instruction, InstructionStream, Operand, Value};

const INDENT: &str = "    ";

/// Disassemble a stream into canonical listing text.
///
/// For streams whose constants are listing literals, the output
/// reassembles to an equal stream.
pub fn disassemble(stream: &InstructionStream) -> String {
    let mut out = String::new();
    let mut emitted = HashSet::new();
    write_functions(stream, &mut emitted, &mut out);
    write_body(stream, "", &mut out);
    out
}

/// Emit a `.func` block for every function constant of `stream` not yet emitted.
fn write_functions(stream: &InstructionStream, emitted: &mut HashSet<String>, out: &mut String) {
    for instr in stream {
        let mut functions = Vec::new();
        if let Some(value) = instr.const_value() {
            collect_functions(value, &mut functions);
        }
        for function in functions {
            if emitted.contains(&function.name) {
                continue;
            }
            write_functions(&function.code, emitted, out);
            emitted.insert(function.name.clone());
            write_function(function, out);
        }
    }
}

fn collect_functions<'v>(value: &'v Value, found: &mut Vec<&'v Function>) {
    match value {
        Value::Callable(Callable::Interpreted(function)) => found.push(function),
        Value::Tuple(items) => items.iter().for_each(|item| collect_functions(item, found)),
        _ => {}
    }
}

fn write_function(function: &Function, out: &mut String) {
    out.push_str(".func ");
    out.push_str(&function.name);
    for param in &function.params {
        out.push(' ');
        out.push_str(param);
    }
    out.push('\n');
    write_body(&function.code, INDENT, out);
    out.push_str(".end\n");
}

fn write_body(stream: &InstructionStream, indent: &str, out: &mut String) {
    for instr in stream {
        out.push_str(indent);
        out.push_str(&format_instruction(instr));
        out.push('\n');
    }
}

fn format_instruction(instr: &Instruction) -> String {
    let mut line = format!("{} {}", instr.offset, instr.opcode.mnemonic());
    if let Some(operand) = &instr.operand {
        line.push(' ');
        line.push_str(&format_operand(operand));
    }
    line
}

fn format_operand(operand: &Operand) -> String {
    match operand {
        Operand::Const(value) => format_const(value),
        Operand::Name(name) => name.clone(),
        Operand::Offset(n) | Operand::Count(n) => n.to_string(),
    }
}

/// A constant as a listing literal.
///
/// Floats use the shortest form that parses back to the same bits, and
/// strings use the lexer's escapes rather than the Python repr.
/// Lists, sets and iterators fall back to their repr, and host functions
/// are written as `@name`; none of these reassemble.
pub(crate) fn format_const(value: &Value) -> String {
    match value {
        Value::Float(x) => format!("{x:?}"),
        Value::Str(s) => format!("'{}'", s.escape_default()),
        Value::Callable(callable) => format!("@{}", callable.name()),
        Value::Tuple(items) => {
            let mut out = String::from("(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format_const(item));
            }
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
            out
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyvm_common::{NativeFunction, OpCode, OpError};

    fn noop(_: &[Value]) -> Result<Value, OpError> {
        Ok(Value::None)
    }

    #[test]
    fn disassemble_empty() {
        assert_eq!(disassemble(&InstructionStream::default()), "");
    }

    #[test]
    fn disassemble_flat_stream() {
        let stream = InstructionStream::from_ops(vec![
            (OpCode::LoadConst, Some(Operand::Const(Value::Int(1)))),
            (OpCode::StoreName, Some(Operand::Name("a".to_string()))),
            (OpCode::LoadConst, Some(Operand::Const(Value::None))),
            (OpCode::ReturnValue, None),
        ]);
        assert_eq!(
            disassemble(&stream),
            "0 LOAD_CONST 1\n2 STORE_NAME a\n4 LOAD_CONST None\n6 RETURN_VALUE\n"
        );
    }

    #[test]
    fn const_literals() {
        assert_eq!(format_const(&Value::Float(10.0)), "10.0");
        assert_eq!(format_const(&Value::Float(10.55)), "10.55");
        assert_eq!(format_const(&Value::Float(1e20)), "1e20");
        assert_eq!(format_const(&Value::Float(f64::NEG_INFINITY)), "-inf");
        assert_eq!(format_const(&Value::from("it's\n")), r"'it\'s\n'");
        assert_eq!(format_const(&Value::from("h\u{e9}")), r"'h\u{e9}'");
        assert_eq!(format_const(&Value::Bool(false)), "False");
        assert_eq!(
            format_const(&Value::tuple(vec![Value::Int(1)])),
            "(1,)"
        );
        assert_eq!(
            format_const(&Value::tuple(vec![Value::Float(2.0), Value::None])),
            "(2.0, None)"
        );
    }

    #[test]
    fn host_functions_are_referenced_by_name() {
        let native = Value::from(NativeFunction::new("noop", noop));
        assert_eq!(format_const(&native), "@noop");
    }

    #[test]
    fn functions_come_first_and_once() {
        let body = InstructionStream::from_ops(vec![
            (OpCode::LoadName, Some(Operand::Name("x".to_string()))),
            (OpCode::ReturnValue, None),
        ]);
        let function = Value::from(Function::new("ident", vec!["x".to_string()], body));
        let stream = InstructionStream::from_ops(vec![
            (OpCode::LoadConst, Some(Operand::Const(function.clone()))),
            (OpCode::LoadConst, Some(Operand::Const(function))),
        ]);
        assert_eq!(
            disassemble(&stream),
            ".func ident x\n    0 LOAD_NAME x\n    2 RETURN_VALUE\n.end\n\
             0 LOAD_CONST @ident\n2 LOAD_CONST @ident\n"
        );
    }
}
