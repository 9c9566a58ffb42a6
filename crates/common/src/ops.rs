//! Unary and binary operators on [`Value`]s.
//!
//! Each operator matches on the concrete variant pair. Integer arithmetic
//! is 64-bit and overflow is an error. Division and modulo round toward
//! negative infinity, so the remainder takes the sign of the divisor.

use std::rc::Rc;

use crate::error::OpError;
use crate::value::{contains_member, sequence_index, Value};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
    Invert,
}

impl UnaryOp {
    /// Operator symbol used in error messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Positive => "+",
            UnaryOp::Negative => "-",
            UnaryOp::Not => "not",
            UnaryOp::Invert => "~",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Power,
    Multiply,
    MatrixMultiply,
    FloorDivide,
    TrueDivide,
    Modulo,
    Add,
    Subtract,
    Subscript,
    LeftShift,
    RightShift,
    And,
    Xor,
    Or,
}

impl BinaryOp {
    /// Operator symbol used in error messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Power => "**",
            BinaryOp::Multiply => "*",
            BinaryOp::MatrixMultiply => "@",
            BinaryOp::FloorDivide => "//",
            BinaryOp::TrueDivide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Subscript => "[]",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::And => "&",
            BinaryOp::Xor => "^",
            BinaryOp::Or => "|",
        }
    }
}

const INT_DIVISION_BY_ZERO: &str = "integer division or modulo by zero";
const ZERO_TO_NEGATIVE_POWER: &str = "0.0 cannot be raised to a negative power";

fn unsupported(op: BinaryOp, lhs: &Value, rhs: &Value) -> OpError {
    OpError::UnsupportedOperands {
        op: op.symbol(),
        left: lhs.type_name(),
        right: rhs.type_name(),
    }
}

impl Value {
    /// Apply a unary operator.
    pub fn unary(&self, op: UnaryOp) -> Result<Value, OpError> {
        let result = match (op, self) {
            (UnaryOp::Not, _) => Value::Bool(!self.is_truthy()),
            (UnaryOp::Positive, Value::Float(x)) => Value::Float(*x),
            (UnaryOp::Negative, Value::Float(x)) => Value::Float(-x),
            (UnaryOp::Positive, Value::Int(_) | Value::Bool(_)) => {
                Value::Int(self.as_int().unwrap_or_default())
            }
            (UnaryOp::Negative, Value::Int(_) | Value::Bool(_)) => Value::Int(
                self.as_int()
                    .unwrap_or_default()
                    .checked_neg()
                    .ok_or(OpError::Overflow { op: op.symbol() })?,
            ),
            (UnaryOp::Invert, Value::Int(_) | Value::Bool(_)) => {
                Value::Int(!self.as_int().unwrap_or_default())
            }
            _ => {
                return Err(OpError::UnsupportedOperand {
                    op: op.symbol(),
                    operand: self.type_name(),
                })
            }
        };
        Ok(result)
    }

    /// Apply a binary operator with `self` as the left operand.
    pub fn binary(&self, op: BinaryOp, rhs: &Value) -> Result<Value, OpError> {
        match op {
            BinaryOp::Subscript => return self.subscript(rhs),
            BinaryOp::MatrixMultiply => return Err(unsupported(op, self, rhs)),
            _ => {}
        }

        if let (Value::Bool(a), Value::Bool(b)) = (self, rhs) {
            match op {
                BinaryOp::And => return Ok(Value::Bool(a & b)),
                BinaryOp::Or => return Ok(Value::Bool(a | b)),
                BinaryOp::Xor => return Ok(Value::Bool(a ^ b)),
                _ => {}
            }
        }

        if let (Some(a), Some(b)) = (self.as_int(), rhs.as_int()) {
            return int_binary(op, a, b).ok_or_else(|| unsupported(op, self, rhs))?;
        }

        if let (Some(a), Some(b)) = (self.as_f64(), rhs.as_f64()) {
            return float_binary(op, a, b).ok_or_else(|| unsupported(op, self, rhs))?;
        }

        sequence_binary(op, self, rhs)
    }

    /// `self[index]` for lists, tuples and strings.
    pub fn subscript(&self, index: &Value) -> Result<Value, OpError> {
        match self {
            Value::List(items) => {
                let items = items.borrow();
                Ok(items[sequence_index("list", items.len(), index)?].clone())
            }
            Value::Tuple(items) => Ok(items[sequence_index("tuple", items.len(), index)?].clone()),
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let c = chars[sequence_index("string", chars.len(), index)?];
                Ok(Value::from(c.to_string()))
            }
            _ => Err(OpError::NotSubscriptable {
                type_name: self.type_name(),
            }),
        }
    }
}

/// Integer arithmetic. `None` means the operator is not defined on ints.
fn int_binary(op: BinaryOp, a: i64, b: i64) -> Option<Result<Value, OpError>> {
    let overflow = OpError::Overflow { op: op.symbol() };
    let result = match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Subtract => a.checked_sub(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Multiply => a.checked_mul(b).map(Value::Int).ok_or(overflow),
        BinaryOp::TrueDivide if b == 0 => Err(OpError::ZeroDivision {
            message: "division by zero",
        }),
        BinaryOp::TrueDivide => Ok(Value::Float(a as f64 / b as f64)),
        BinaryOp::FloorDivide | BinaryOp::Modulo if b == 0 => Err(OpError::ZeroDivision {
            message: INT_DIVISION_BY_ZERO,
        }),
        BinaryOp::FloorDivide => a
            .checked_div(b)
            .map(|d| {
                if a % b != 0 && (a < 0) != (b < 0) {
                    Value::Int(d - 1)
                } else {
                    Value::Int(d)
                }
            })
            .ok_or(overflow),
        BinaryOp::Modulo => {
            let r = a.wrapping_rem(b);
            if r != 0 && (r < 0) != (b < 0) {
                Ok(Value::Int(r + b))
            } else {
                Ok(Value::Int(r))
            }
        }
        BinaryOp::Power => int_power(a, b),
        BinaryOp::LeftShift | BinaryOp::RightShift if b < 0 => Err(OpError::NegativeShift),
        BinaryOp::LeftShift if a == 0 => Ok(Value::Int(0)),
        BinaryOp::LeftShift => {
            if b >= 64 || (a << b) >> b != a {
                Err(overflow)
            } else {
                Ok(Value::Int(a << b))
            }
        }
        BinaryOp::RightShift if b >= 64 => Ok(Value::Int(if a < 0 { -1 } else { 0 })),
        BinaryOp::RightShift => Ok(Value::Int(a >> b)),
        BinaryOp::And => Ok(Value::Int(a & b)),
        BinaryOp::Xor => Ok(Value::Int(a ^ b)),
        BinaryOp::Or => Ok(Value::Int(a | b)),
        BinaryOp::MatrixMultiply | BinaryOp::Subscript => return None,
    };
    Some(result)
}

fn int_power(base: i64, exp: i64) -> Result<Value, OpError> {
    if exp < 0 {
        if base == 0 {
            return Err(OpError::ZeroDivision {
                message: ZERO_TO_NEGATIVE_POWER,
            });
        }
        return Ok(Value::Float((base as f64).powf(exp as f64)));
    }
    match base {
        0 | 1 => return Ok(Value::Int(if exp == 0 { 1 } else { base })),
        -1 => return Ok(Value::Int(if exp % 2 == 0 { 1 } else { -1 })),
        _ => {}
    }
    u32::try_from(exp)
        .ok()
        .and_then(|exp| base.checked_pow(exp))
        .map(Value::Int)
        .ok_or(OpError::Overflow { op: "**" })
}

/// Float arithmetic, used when at least one side is a float.
fn float_binary(op: BinaryOp, a: f64, b: f64) -> Option<Result<Value, OpError>> {
    let result = match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Subtract => Ok(Value::Float(a - b)),
        BinaryOp::Multiply => Ok(Value::Float(a * b)),
        BinaryOp::TrueDivide if b == 0.0 => Err(OpError::ZeroDivision {
            message: "float division by zero",
        }),
        BinaryOp::TrueDivide => Ok(Value::Float(a / b)),
        BinaryOp::FloorDivide if b == 0.0 => Err(OpError::ZeroDivision {
            message: "float floor division by zero",
        }),
        BinaryOp::FloorDivide => Ok(Value::Float(float_divmod(a, b).0)),
        BinaryOp::Modulo if b == 0.0 => Err(OpError::ZeroDivision {
            message: "float modulo",
        }),
        BinaryOp::Modulo => Ok(Value::Float(float_divmod(a, b).1)),
        BinaryOp::Power if a == 0.0 && b < 0.0 => Err(OpError::ZeroDivision {
            message: ZERO_TO_NEGATIVE_POWER,
        }),
        BinaryOp::Power if a < 0.0 && b.fract() != 0.0 => Err(OpError::InvalidValue {
            message: "negative number cannot be raised to a fractional power".to_string(),
        }),
        BinaryOp::Power => Ok(Value::Float(a.powf(b))),
        _ => return None,
    };
    Some(result)
}

fn float_divmod(a: f64, b: f64) -> (f64, f64) {
    let mut modulo = a % b;
    let mut div = (a - modulo) / b;
    if modulo != 0.0 && (b < 0.0) != (modulo < 0.0) {
        modulo += b;
        div -= 1.0;
    }
    (div.floor(), modulo)
}

/// String, list, tuple and set operators.
fn sequence_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, OpError> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::from(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOp::Multiply, seq, count) | (BinaryOp::Multiply, count, seq)
            if count.as_int().is_some() =>
        {
            let times = usize::try_from(count.as_int().unwrap_or_default()).unwrap_or(0);
            repeat(seq, times).unwrap_or_else(|| Err(unsupported(op, lhs, rhs)))
        }
        (_, Value::Set(a), Value::Set(b)) => {
            let members: Vec<Value> = match op {
                BinaryOp::Subtract => a.iter().filter(|m| !contains_member(b, m)).cloned().collect(),
                BinaryOp::And => a.iter().filter(|m| contains_member(b, m)).cloned().collect(),
                BinaryOp::Or => a
                    .iter()
                    .cloned()
                    .chain(b.iter().filter(|m| !contains_member(a, m)).cloned())
                    .collect(),
                BinaryOp::Xor => a
                    .iter()
                    .filter(|m| !contains_member(b, m))
                    .chain(b.iter().filter(|m| !contains_member(a, m)))
                    .cloned()
                    .collect(),
                _ => return Err(unsupported(op, lhs, rhs)),
            };
            Ok(Value::Set(Rc::new(members)))
        }
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

/// Longest str (in bytes), list or tuple that `*` will build.
pub const MAX_REPEAT_LEN: usize = 1 << 28;

fn repeat(seq: &Value, times: usize) -> Option<Result<Value, OpError>> {
    let len = match seq {
        Value::Str(s) => s.len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        _ => return None,
    };
    if len.checked_mul(times).map_or(true, |total| total > MAX_REPEAT_LEN) {
        return Some(Err(OpError::Overflow { op: "*" }));
    }
    let cycle = |items: &[Value]| -> Vec<Value> {
        std::iter::repeat(items)
            .take(times)
            .flatten()
            .cloned()
            .collect()
    };
    Some(Ok(match seq {
        Value::Str(s) => Value::from(s.repeat(times)),
        Value::List(items) => Value::list(cycle(items.borrow().as_slice())),
        Value::Tuple(items) => Value::tuple(cycle(items.as_slice())),
        _ => return None,
    }))
}
