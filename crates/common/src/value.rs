//! Runtime value representation for the pyvm interpreter.
//!
//! Values are what live on the operand stack and in the name scopes.
//! Everything is immutable once built except lists, which share their
//! storage between clones and can be updated in place.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt::{self, Write as _};
use std::rc::Rc;

use crate::error::OpError;
use crate::stream::InstructionStream;

/// Signature of a host-provided function.
pub type NativeFn = fn(&[Value]) -> Result<Value, OpError>;

/// A function implemented by the host.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    /// Name the function is known by, used in errors and equality.
    pub name: &'static str,
    /// The implementation.
    pub func: NativeFn,
}

impl NativeFunction {
    /// Wrap a host function.
    pub fn new(name: &'static str, func: NativeFn) -> Self {
        Self { name, func }
    }

    /// Invoke the function with positional arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value, OpError> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Interpreted code: an instruction stream with its parameter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Positional parameter names, bound in order at call time.
    pub params: Vec<String>,
    /// The body.
    pub code: InstructionStream,
}

impl Function {
    /// Create a new interpreted function.
    pub fn new(name: impl Into<String>, params: Vec<String>, code: InstructionStream) -> Self {
        Self {
            name: name.into(),
            params,
            code,
        }
    }
}

/// Something that can be called by CALL_FUNCTION.
///
/// Whether a callable is host code or interpreted code is fixed when it
/// is constructed.
#[derive(Debug, Clone)]
pub enum Callable {
    /// Host function, invoked directly.
    Native(NativeFunction),
    /// Interpreted function, run in a fresh frame.
    Interpreted(Rc<Function>),
}

impl Callable {
    /// The callable's name.
    pub fn name(&self) -> &str {
        match self {
            Callable::Native(native) => native.name,
            Callable::Interpreted(function) => &function.name,
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => a.name == b.name,
            (Callable::Interpreted(a), Callable::Interpreted(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl Eq for Callable {}

/// Cursor over a snapshot of items, produced by GET_ITER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueIter {
    items: Vec<Value>,
    position: usize,
}

impl ValueIter {
    /// Create an iterator over the given items.
    pub fn new(items: Vec<Value>) -> Self {
        Self { items, position: 0 }
    }

    /// Number of items not yet produced.
    pub fn remaining(&self) -> usize {
        self.items.len() - self.position
    }
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let item = self.items.get(self.position).cloned()?;
        self.position += 1;
        Some(item)
    }
}

/// Runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Signed 64-bit integer.
    Int(i64),
    /// IEEE 754 64-bit float.
    Float(f64),
    /// Boolean. Never equal to an `Int`, even 0 or 1.
    Bool(bool),
    /// Immutable string.
    Str(Rc<str>),
    /// The absent value.
    None,
    /// Mutable list. Clones share storage.
    List(Rc<RefCell<Vec<Value>>>),
    /// Immutable ordered sequence.
    Tuple(Rc<Vec<Value>>),
    /// Unique members in first-insertion order; equality ignores order.
    Set(Rc<Vec<Value>>),
    /// Host or interpreted function.
    Callable(Callable),
    /// Iterator produced by GET_ITER. Clones share the cursor.
    Iterator(Rc<RefCell<ValueIter>>),
}

// Floats compare bitwise so Value can implement Eq. Int and Bool are
// deliberately distinct: `True` is not the constant `1`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|member| contains_member(b, member))
            }
            (Value::Callable(a), Value::Callable(b)) => a == b,
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Set membership equality.
///
/// An int and a float holding the same number are one member, and floats
/// compare by value, so `0.0` and `-0.0` coincide. Bools never match ints.
pub(crate) fn same_member(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x == y || x.to_bits() == y.to_bits(),
        (Value::Int(n), Value::Float(x)) | (Value::Float(x), Value::Int(n)) => {
            int_equals_float(*n, *x)
        }
        (Value::Tuple(xs), Value::Tuple(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| same_member(x, y))
        }
        _ => a == b,
    }
}

/// True if `members` already holds a member equal to `value`.
pub(crate) fn contains_member(members: &[Value], value: &Value) -> bool {
    members.iter().any(|member| same_member(member, value))
}

// 2^63 is the first float past i64::MAX.
fn int_equals_float(n: i64, x: f64) -> bool {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    x.fract() == 0.0 && (-LIMIT..LIMIT).contains(&x) && x as i64 == n
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<NativeFunction> for Value {
    fn from(native: NativeFunction) -> Self {
        Value::Callable(Callable::Native(native))
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Callable(Callable::Interpreted(Rc::new(function)))
    }
}

impl Value {
    /// Build a list value.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Build a tuple value.
    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    /// Build a set value, dropping duplicates and rejecting unhashable members.
    pub fn set(items: Vec<Value>) -> Result<Self, OpError> {
        let mut members: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !item.is_hashable() {
                return Err(OpError::Unhashable {
                    type_name: item.type_name(),
                });
            }
            if !contains_member(&members, &item) {
                members.push(item);
            }
        }
        Ok(Value::Set(Rc::new(members)))
    }

    /// Build an iterator value over the given items.
    pub fn iterator(items: Vec<Value>) -> Self {
        Value::Iterator(Rc::new(RefCell::new(ValueIter::new(items))))
    }

    /// Python type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::None => "NoneType",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Callable(Callable::Native(_)) => "builtin_function_or_method",
            Value::Callable(Callable::Interpreted(_)) => "function",
            Value::Iterator(_) => "iterator",
        }
    }

    /// Truthiness, as used by conditional jumps and `not`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::None => false,
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) | Value::Set(items) => !items.is_empty(),
            Value::Callable(_) | Value::Iterator(_) => true,
        }
    }

    /// Whether the value may be a set member.
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Set(_) | Value::Iterator(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Whether the value already supports resumable iteration and can be
    /// delegated to as-is.
    pub fn is_generator_like(&self) -> bool {
        matches!(self, Value::Iterator(_))
    }

    /// The integer view of ints and bools.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Produce an iterator over the value.
    ///
    /// Iterating an iterator yields the same iterator.
    pub fn iter(&self) -> Result<Value, OpError> {
        match self {
            Value::Iterator(_) => Ok(self.clone()),
            _ => Ok(Value::iterator(self.items()?)),
        }
    }

    /// Snapshot of the items an iteration over this value would produce.
    pub fn items(&self) -> Result<Vec<Value>, OpError> {
        match self {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Tuple(items) | Value::Set(items) => Ok(items.as_ref().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
            Value::Iterator(iter) => Ok(iter.borrow_mut().by_ref().collect()),
            _ => Err(OpError::NotIterable {
                type_name: self.type_name(),
            }),
        }
    }

    /// Replace a list element in place. Negative indices count from the end.
    pub fn set_item(&self, index: &Value, item: Value) -> Result<(), OpError> {
        let Value::List(items) = self else {
            return Err(OpError::InvalidArgument {
                message: format!(
                    "'{}' object does not support item assignment",
                    self.type_name()
                ),
            });
        };
        let mut items = items.borrow_mut();
        let position = sequence_index("list", items.len(), index)?;
        items[position] = item;
        Ok(())
    }

    /// Ordering between numbers, or between strings.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Float(a), _) => other.as_f64().and_then(|b| a.partial_cmp(&b)),
            (_, Value::Float(b)) => self.as_f64().and_then(|a| a.partial_cmp(b)),
            _ => Some(self.as_int()?.cmp(&other.as_int()?)),
        }
    }

    /// Float view of numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => self.as_int().map(|n| n as f64),
        }
    }

    /// The `str()` form: strings unquoted, everything else as `repr()`.
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Resolve a possibly negative index against a sequence length.
pub(crate) fn sequence_index(
    container: &'static str,
    len: usize,
    index: &Value,
) -> Result<usize, OpError> {
    let raw = index.as_int().ok_or(OpError::IndexType {
        container,
        index: index.type_name(),
    })?;
    let len = len as i64;
    let resolved = if raw < 0 { raw + len } else { raw };
    if (0..len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(OpError::IndexOutOfRange { container })
    }
}

fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        let sign = if x > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Python's string repr: single quotes unless the text holds a single
/// quote and no double quote, printable non-ASCII kept as is.
fn write_str_repr(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if c.is_control() => match u32::from(c) {
                n @ 0..=0xff => write!(f, "\\x{n:02x}")?,
                n => write!(f, "\\u{n:04x}")?,
            },
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// The `repr()` form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Str(s) => write_str_repr(f, s),
            Value::None => f.write_str("None"),
            Value::List(items) => {
                f.write_str("[")?;
                write_seq(f, &items.borrow())?;
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Set(items) if items.is_empty() => f.write_str("set()"),
            Value::Set(items) => {
                f.write_str("{")?;
                write_seq(f, items)?;
                f.write_str("}")
            }
            Value::Callable(Callable::Native(native)) => {
                write!(f, "<built-in function {}>", native.name)
            }
            Value::Callable(Callable::Interpreted(function)) => {
                write!(f, "<function {}>", function.name)
            }
            Value::Iterator(_) => f.write_str("<iterator>"),
        }
    }
}
