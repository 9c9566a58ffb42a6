//! Standard builtin functions available to interpreted code.

use std::cmp::Ordering;

use pyvm_common::{NativeFn, NativeFunction, OpError, Value};

use crate::scope::{BuiltinModule, Builtins};

/// The standard builtin module: `print`, `len`, conversions and friends.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBuiltins;

/// Every name [`StandardBuiltins`] provides.
pub const STANDARD_NAMES: [&str; 15] = [
    "print", "len", "abs", "min", "max", "str", "repr", "int", "float", "bool", "list", "tuple",
    "set", "iter", "next",
];

impl StandardBuiltins {
    fn lookup(name: &str) -> Option<(&'static str, NativeFn)> {
        let name = STANDARD_NAMES.iter().copied().find(|n| *n == name)?;
        let func: NativeFn = match name {
            "print" => builtin_print,
            "len" => builtin_len,
            "abs" => builtin_abs,
            "min" => builtin_min,
            "max" => builtin_max,
            "str" => builtin_str,
            "repr" => builtin_repr,
            "int" => builtin_int,
            "float" => builtin_float,
            "bool" => builtin_bool,
            "list" => builtin_list,
            "tuple" => builtin_tuple,
            "set" => builtin_set,
            "iter" => builtin_iter,
            "next" => builtin_next,
            _ => return None,
        };
        Some((name, func))
    }
}

impl BuiltinModule for StandardBuiltins {
    fn member(&self, name: &str) -> Option<Value> {
        Self::lookup(name).map(|(name, func)| Value::from(NativeFunction::new(name, func)))
    }
}

/// A builtin scope holding the standard builtins.
pub fn standard_builtins() -> Builtins {
    Builtins::from_module(StandardBuiltins)
}

fn check_arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), OpError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {min}")
    } else if args.len() < min {
        format!("at least {min}")
    } else {
        format!("at most {max}")
    };
    Err(OpError::InvalidArgument {
        message: format!(
            "{name}() takes {expected} argument(s) ({} given)",
            args.len()
        ),
    })
}

fn builtin_print(args: &[Value]) -> Result<Value, OpError> {
    let line: Vec<String> = args.iter().map(Value::to_str).collect();
    println!("{}", line.join(" "));
    Ok(Value::None)
}

fn builtin_len(args: &[Value]) -> Result<Value, OpError> {
    check_arity("len", args, 1, 1)?;
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) | Value::Set(items) => items.len(),
        other => {
            return Err(OpError::InvalidArgument {
                message: format!("object of type '{}' has no len()", other.type_name()),
            })
        }
    };
    Ok(Value::Int(len as i64))
}

fn builtin_abs(args: &[Value]) -> Result<Value, OpError> {
    check_arity("abs", args, 1, 1)?;
    match &args[0] {
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => match other.as_int() {
            Some(n) => n
                .checked_abs()
                .map(Value::Int)
                .ok_or(OpError::Overflow { op: "abs" }),
            None => Err(OpError::InvalidArgument {
                message: format!("bad operand type for abs(): '{}'", other.type_name()),
            }),
        },
    }
}

/// Shared body of `min` and `max`: keep the first item for which no later
/// item compares as `wanted`.
fn extreme(name: &str, args: &[Value], wanted: Ordering) -> Result<Value, OpError> {
    check_arity(name, args, 1, usize::MAX)?;
    let items = if args.len() == 1 {
        args[0].items()?
    } else {
        args.to_vec()
    };
    let symbol = if wanted == Ordering::Less { "<" } else { ">" };
    let mut items = items.into_iter();
    let mut best = items.next().ok_or_else(|| OpError::InvalidValue {
        message: format!("{name}() arg is an empty sequence"),
    })?;
    for item in items {
        let ordering = item.compare(&best).ok_or_else(|| OpError::InvalidArgument {
            message: format!(
                "'{symbol}' not supported between instances of '{}' and '{}'",
                item.type_name(),
                best.type_name()
            ),
        })?;
        if ordering == wanted {
            best = item;
        }
    }
    Ok(best)
}

fn builtin_min(args: &[Value]) -> Result<Value, OpError> {
    extreme("min", args, Ordering::Less)
}

fn builtin_max(args: &[Value]) -> Result<Value, OpError> {
    extreme("max", args, Ordering::Greater)
}

fn builtin_str(args: &[Value]) -> Result<Value, OpError> {
    check_arity("str", args, 0, 1)?;
    Ok(Value::from(args.first().map(Value::to_str).unwrap_or_default()))
}

fn builtin_repr(args: &[Value]) -> Result<Value, OpError> {
    check_arity("repr", args, 1, 1)?;
    Ok(Value::from(args[0].to_string()))
}

fn builtin_int(args: &[Value]) -> Result<Value, OpError> {
    check_arity("int", args, 0, 1)?;
    let Some(arg) = args.first() else {
        return Ok(Value::Int(0));
    };
    match arg {
        Value::Float(x) if !x.is_finite() => Err(OpError::InvalidValue {
            message: format!("cannot convert float {} to integer", arg),
        }),
        Value::Float(x) => {
            let truncated = x.trunc();
            if truncated < -9.223_372_036_854_776e18 || truncated >= 9.223_372_036_854_776e18 {
                Err(OpError::Overflow { op: "int" })
            } else {
                Ok(Value::Int(truncated as i64))
            }
        }
        Value::Str(s) => s
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| OpError::InvalidValue {
                message: format!("invalid literal for int() with base 10: {arg}"),
            }),
        other => other.as_int().map(Value::Int).ok_or_else(|| OpError::InvalidArgument {
            message: format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ),
        }),
    }
}

fn builtin_float(args: &[Value]) -> Result<Value, OpError> {
    check_arity("float", args, 0, 1)?;
    let Some(arg) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match arg {
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| OpError::InvalidValue {
                message: format!("could not convert string to float: {arg}"),
            }),
        other => other.as_f64().map(Value::Float).ok_or_else(|| OpError::InvalidArgument {
            message: format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ),
        }),
    }
}

fn builtin_bool(args: &[Value]) -> Result<Value, OpError> {
    check_arity("bool", args, 0, 1)?;
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

fn builtin_list(args: &[Value]) -> Result<Value, OpError> {
    check_arity("list", args, 0, 1)?;
    let items = args.first().map(Value::items).transpose()?;
    Ok(Value::list(items.unwrap_or_default()))
}

fn builtin_tuple(args: &[Value]) -> Result<Value, OpError> {
    check_arity("tuple", args, 0, 1)?;
    let items = args.first().map(Value::items).transpose()?;
    Ok(Value::tuple(items.unwrap_or_default()))
}

fn builtin_set(args: &[Value]) -> Result<Value, OpError> {
    check_arity("set", args, 0, 1)?;
    let items = args.first().map(Value::items).transpose()?;
    Value::set(items.unwrap_or_default())
}

fn builtin_iter(args: &[Value]) -> Result<Value, OpError> {
    check_arity("iter", args, 1, 1)?;
    args[0].iter()
}

fn builtin_next(args: &[Value]) -> Result<Value, OpError> {
    check_arity("next", args, 1, 2)?;
    let Value::Iterator(iter) = &args[0] else {
        return Err(OpError::InvalidArgument {
            message: format!("'{}' object is not an iterator", args[0].type_name()),
        });
    };
    let item = iter.borrow_mut().next();
    item.or_else(|| args.get(1).cloned())
        .ok_or(OpError::StopIteration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, OpError> {
        let Some(Value::Callable(pyvm_common::Callable::Native(native))) =
            StandardBuiltins.member(name)
        else {
            panic!("{name} is not a native builtin");
        };
        native.call(args)
    }

    #[test]
    fn every_standard_name_resolves() {
        for name in STANDARD_NAMES {
            assert!(StandardBuiltins.member(name).is_some(), "{name}");
        }
        assert!(StandardBuiltins.member("open").is_none());
    }

    #[test]
    fn len_counts_characters_and_items() {
        assert_eq!(call("len", &[Value::from("héllo")]), Ok(Value::Int(5)));
        assert_eq!(
            call("len", &[Value::list(vec![Value::None, Value::None])]),
            Ok(Value::Int(2))
        );
        assert!(matches!(
            call("len", &[Value::Int(3)]),
            Err(OpError::InvalidArgument { .. })
        ));
        assert!(matches!(
            call("len", &[]),
            Err(OpError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn min_and_max() {
        let args = [Value::Int(3), Value::Float(1.5), Value::Int(7)];
        assert_eq!(call("min", &args), Ok(Value::Float(1.5)));
        assert_eq!(call("max", &args), Ok(Value::Int(7)));
        let list = Value::list(vec![Value::from("b"), Value::from("a")]);
        assert_eq!(call("min", &[list]), Ok(Value::from("a")));
        assert!(matches!(
            call("max", &[Value::list(vec![])]),
            Err(OpError::InvalidValue { .. })
        ));
        assert!(matches!(
            call("max", &[Value::Int(1), Value::from("a")]),
            Err(OpError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn conversions() {
        assert_eq!(call("int", &[Value::from(" 42 ")]), Ok(Value::Int(42)));
        assert_eq!(call("int", &[Value::Float(-2.7)]), Ok(Value::Int(-2)));
        assert_eq!(call("int", &[Value::Bool(true)]), Ok(Value::Int(1)));
        assert!(matches!(
            call("int", &[Value::from("x")]),
            Err(OpError::InvalidValue { .. })
        ));
        assert_eq!(call("float", &[Value::from("2.5")]), Ok(Value::Float(2.5)));
        assert_eq!(call("float", &[Value::Int(2)]), Ok(Value::Float(2.0)));
        assert_eq!(call("str", &[Value::Float(1.0)]), Ok(Value::from("1.0")));
        assert_eq!(call("str", &[]), Ok(Value::from("")));
        assert_eq!(call("repr", &[Value::from("a")]), Ok(Value::from("'a'")));
        assert_eq!(call("bool", &[Value::list(vec![])]), Ok(Value::Bool(false)));
        assert_eq!(call("abs", &[Value::Int(-4)]), Ok(Value::Int(4)));
        assert_eq!(
            call("abs", &[Value::Int(i64::MIN)]),
            Err(OpError::Overflow { op: "abs" })
        );
    }

    #[test]
    fn containers_from_iterables() {
        assert_eq!(
            call("list", &[Value::from("ab")]),
            Ok(Value::list(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(
            call("tuple", &[Value::list(vec![Value::Int(1)])]),
            Ok(Value::tuple(vec![Value::Int(1)]))
        );
        assert_eq!(
            call("set", &[Value::tuple(vec![Value::Int(1), Value::Int(1)])]),
            Value::set(vec![Value::Int(1)])
        );
        assert_eq!(call("list", &[]), Ok(Value::list(vec![])));
    }

    #[test]
    fn iter_and_next() {
        let it = call("iter", &[Value::tuple(vec![Value::Int(1)])]).unwrap();
        assert_eq!(call("next", &[it.clone()]), Ok(Value::Int(1)));
        assert_eq!(call("next", &[it.clone(), Value::None]), Ok(Value::None));
        assert_eq!(call("next", &[it]), Err(OpError::StopIteration));
        assert!(matches!(
            call("next", &[Value::list(vec![])]),
            Err(OpError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn print_returns_none() {
        assert_eq!(call("print", &[Value::from("Hello, world!")]), Ok(Value::None));
    }
}
