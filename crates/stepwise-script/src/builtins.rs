//! Built-in functions and methods of the core types.

use std::cmp::Ordering;
use std::io::Write;
use std::rc::Rc;

use stepwise_core::RenderError;

use crate::ast::BinOp;
use crate::ops::{self, OpResult};
use crate::value::{Builtin, ExceptionKind, ExceptionValue, Value, dict_lookup};

fn render_failure(err: &RenderError) -> ExceptionValue
{
    ExceptionValue::new(ExceptionKind::RuntimeError, err.to_string())
}

pub fn repr(value: &Value) -> OpResult<String>
{
    value.repr().map_err(|err| render_failure(&err))
}

pub fn to_str(value: &Value) -> OpResult<String>
{
    value.to_str().map_err(|err| render_failure(&err))
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> OpResult<()>
{
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let message = if min == max {
        match min {
            0 => format!("{name}() takes no arguments ({} given)", args.len()),
            1 => format!("{name}() takes exactly one argument ({} given)", args.len()),
            n => format!("{name}() takes exactly {n} arguments ({} given)", args.len()),
        }
    } else if args.len() < min {
        format!("{name}() expected at least {min} argument{}, got {}", plural(min), args.len())
    } else {
        format!("{name}() expected at most {max} argument{}, got {}", plural(max), args.len())
    };
    Err(ExceptionValue::type_error(message))
}

const fn plural(n: usize) -> &'static str
{
    if n == 1 { "" } else { "s" }
}

fn int_arg(name: &str, value: &Value) -> OpResult<i64>
{
    value.as_int().ok_or_else(|| {
        ExceptionValue::type_error(format!(
            "'{}' object cannot be interpreted as an integer in {name}()",
            value.type_name()
        ))
    })
}

/// Call a built-in function. `print` writes to `output`.
pub fn call_builtin(builtin: Builtin, args: Vec<Value>, output: &mut dyn Write) -> OpResult<Value>
{
    let name = builtin.name();
    match builtin {
        Builtin::Print => {
            let parts = args.iter().map(to_str).collect::<OpResult<Vec<_>>>()?;
            let line = parts.join(" ");
            writeln!(output, "{line}")
                .and_then(|()| output.flush())
                .map_err(|err| ExceptionValue::new(ExceptionKind::OSError, err.to_string()))?;
            Ok(Value::None)
        }
        Builtin::Len => {
            arity(name, &args, 1, 1)?;
            ops::len(&args[0]).map(Value::Int)
        }
        Builtin::Range => {
            arity(name, &args, 1, 3)?;
            let ints = args.iter().map(|arg| int_arg(name, arg)).collect::<OpResult<Vec<_>>>()?;
            let (start, stop, step) = match ints.as_slice() {
                [start, stop, step] => (*start, *stop, *step),
                [start, stop] => (*start, *stop, 1),
                [stop] => (0, *stop, 1),
                _ => (0, 0, 1),
            };
            if step == 0 {
                return Err(ExceptionValue::value_error("range() arg 3 must not be zero"));
            }
            Ok(Value::Range { start, stop, step })
        }
        Builtin::Str => {
            arity(name, &args, 0, 1)?;
            let text = args.first().map_or_else(|| Ok(String::new()), to_str)?;
            Ok(Value::str(&text))
        }
        Builtin::Repr => {
            arity(name, &args, 1, 1)?;
            Ok(Value::str(&repr(&args[0])?))
        }
        Builtin::Int => {
            arity(name, &args, 0, 1)?;
            args.first().map_or(Ok(Value::Int(0)), to_int)
        }
        Builtin::Float => {
            arity(name, &args, 0, 1)?;
            args.first().map_or(Ok(Value::Float(0.0)), to_float)
        }
        Builtin::Abs => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => match other.as_int() {
                    Some(i) => i
                        .checked_abs()
                        .map(Value::Int)
                        .ok_or_else(|| ExceptionValue::new(ExceptionKind::OverflowError, "integer overflow")),
                    None => Err(ExceptionValue::type_error(format!(
                        "bad operand type for abs(): '{}'",
                        other.type_name()
                    ))),
                },
            }
        }
        Builtin::Min => extreme(name, args, Ordering::Less),
        Builtin::Max => extreme(name, args, Ordering::Greater),
        Builtin::Sum => {
            arity(name, &args, 1, 2)?;
            let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
            if matches!(total, Value::Str(_)) {
                return Err(ExceptionValue::type_error(
                    "sum() can't sum strings [use ''.join(seq) instead]",
                ));
            }
            for item in ops::collect(&args[0])? {
                total = ops::binary(BinOp::Add, &total, &item)?;
            }
            Ok(total)
        }
        Builtin::Exception(kind) => {
            let message = match args.as_slice() {
                [] => String::new(),
                [single] => to_str(single)?,
                many => repr(&Value::tuple(many.to_vec()))?,
            };
            Ok(Value::Exception(Rc::new(ExceptionValue::new(kind, message))))
        }
    }
}

/// 2^63: floats truncated into `[-2^63, 2^63)` fit an `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn to_int(value: &Value) -> OpResult<Value>
{
    match value {
        Value::Float(f) if f.is_nan() => Err(ExceptionValue::value_error("cannot convert float NaN to integer")),
        Value::Float(f) if f.is_infinite() => Err(ExceptionValue::new(
            ExceptionKind::OverflowError,
            "cannot convert float infinity to integer",
        )),
        Value::Float(f) if !(-I64_BOUND..I64_BOUND).contains(&f.trunc()) => Err(ExceptionValue::new(
            ExceptionKind::OverflowError,
            "cannot convert float to integer: out of range",
        )),
        #[allow(clippy::cast_possible_truncation)]
        Value::Float(f) => Ok(Value::Int(f.trunc() as i64)),
        Value::Str(text) => text
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| {
                ExceptionValue::value_error(format!(
                    "invalid literal for int() with base 10: {}",
                    crate::value::quote(text)
                ))
            }),
        other => other.as_int().map(Value::Int).ok_or_else(|| {
            ExceptionValue::type_error(format!(
                "int() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn to_float(value: &Value) -> OpResult<Value>
{
    match value {
        Value::Str(text) => {
            let trimmed = text.trim().to_lowercase();
            let parsed = match trimmed.as_str() {
                "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
                "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => other.parse::<f64>(),
            };
            parsed.map(Value::Float).map_err(|_| {
                ExceptionValue::value_error(format!(
                    "could not convert string to float: {}",
                    crate::value::quote(text)
                ))
            })
        }
        other => other.as_number().map(|n| Value::Float(n.as_f64())).ok_or_else(|| {
            ExceptionValue::type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

/// `min`/`max` over one iterable or several arguments.
fn extreme(name: &str, args: Vec<Value>, wanted: Ordering) -> OpResult<Value>
{
    let candidates = match args.len() {
        0 => return Err(ExceptionValue::type_error(format!("{name} expected at least 1 argument, got 0"))),
        1 => ops::collect(&args[0])?,
        _ => args,
    };

    let mut best: Option<Value> = None;
    for candidate in candidates {
        best = Some(match best {
            None => candidate,
            Some(current) => match ops::ordering(&candidate, &current)? {
                Some(order) if order == wanted => candidate,
                Some(_) => current,
                None => {
                    return Err(ExceptionValue::type_error(format!(
                        "'{}' not supported between instances of '{}' and '{}'",
                        if wanted == Ordering::Less { "<" } else { ">" },
                        candidate.type_name(),
                        current.type_name()
                    )));
                }
            },
        });
    }
    best.ok_or_else(|| ExceptionValue::value_error(format!("{name}() arg is an empty sequence")))
}

fn no_attribute(receiver: &Value, name: &str) -> ExceptionValue
{
    ExceptionValue::new(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute '{name}'", receiver.type_name()),
    )
}

/// Call `receiver.name(args)`.
pub fn call_method(receiver: &Value, name: &str, args: Vec<Value>) -> OpResult<Value>
{
    let qualified = format!("{}.{name}", receiver.type_name());
    match receiver {
        Value::List(items) => match name {
            "append" => {
                arity(&qualified, &args, 1, 1)?;
                items.borrow_mut().extend(args);
                Ok(Value::None)
            }
            "extend" => {
                arity(&qualified, &args, 1, 1)?;
                let extra = ops::collect(&args[0])?;
                items.borrow_mut().extend(extra);
                Ok(Value::None)
            }
            "pop" => {
                arity(&qualified, &args, 0, 1)?;
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(ExceptionValue::new(ExceptionKind::IndexError, "pop from empty list"));
                }
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                let index = match args.first() {
                    Some(arg) => int_arg(&qualified, arg)?,
                    None => len - 1,
                };
                let index = if index < 0 { index + len } else { index };
                let index = usize::try_from(index)
                    .ok()
                    .filter(|i| *i < items.len())
                    .ok_or_else(|| ExceptionValue::new(ExceptionKind::IndexError, "pop index out of range"))?;
                Ok(items.remove(index))
            }
            _ => Err(no_attribute(receiver, name)),
        },
        Value::Dict(entries) => match name {
            "items" => {
                arity(&qualified, &args, 0, 0)?;
                let pairs = entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| Value::tuple(vec![key.clone(), value.clone()]))
                    .collect();
                Ok(Value::list(pairs))
            }
            "keys" => {
                arity(&qualified, &args, 0, 0)?;
                Ok(Value::list(entries.borrow().iter().map(|(key, _)| key.clone()).collect()))
            }
            "values" => {
                arity(&qualified, &args, 0, 0)?;
                Ok(Value::list(entries.borrow().iter().map(|(_, value)| value.clone()).collect()))
            }
            "get" => {
                arity(&qualified, &args, 1, 2)?;
                if !args[0].is_hashable() {
                    return Err(ExceptionValue::type_error(format!(
                        "unhashable type: '{}'",
                        args[0].type_name()
                    )));
                }
                let found = dict_lookup(&entries.borrow(), &args[0]);
                Ok(found.unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
            }
            _ => Err(no_attribute(receiver, name)),
        },
        Value::Str(text) => string_method(receiver, text, name, &qualified, &args),
        _ => Err(no_attribute(receiver, name)),
    }
}

fn string_method(receiver: &Value, text: &str, name: &str, qualified: &str, args: &[Value]) -> OpResult<Value>
{
    let str_arg = |value: &Value| match value {
        Value::Str(s) => Ok(Some(s.to_string())),
        Value::None => Ok(None),
        other => Err(ExceptionValue::type_error(format!(
            "must be str or None, not {}",
            other.type_name()
        ))),
    };

    match name {
        "upper" => {
            arity(qualified, args, 0, 0)?;
            Ok(Value::str(&text.to_uppercase()))
        }
        "lower" => {
            arity(qualified, args, 0, 0)?;
            Ok(Value::str(&text.to_lowercase()))
        }
        "strip" => {
            arity(qualified, args, 0, 1)?;
            let stripped = match args.first().map(str_arg).transpose()?.flatten() {
                Some(chars) => text.trim_matches(|c: char| chars.contains(c)),
                None => text.trim(),
            };
            Ok(Value::str(stripped))
        }
        "split" => {
            arity(qualified, args, 0, 1)?;
            let parts: Vec<Value> = match args.first().map(str_arg).transpose()?.flatten() {
                Some(sep) if sep.is_empty() => return Err(ExceptionValue::value_error("empty separator")),
                Some(sep) => text.split(sep.as_str()).map(Value::str).collect(),
                None => text.split_whitespace().map(Value::str).collect(),
            };
            Ok(Value::list(parts))
        }
        "join" => {
            arity(qualified, args, 1, 1)?;
            let items = ops::collect(&args[0])?;
            let mut pieces = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Str(s) => pieces.push(s.to_string()),
                    other => {
                        return Err(ExceptionValue::type_error(format!(
                            "sequence item {i}: expected str instance, {} found",
                            other.type_name()
                        )));
                    }
                }
            }
            Ok(Value::str(&pieces.join(text)))
        }
        _ => Err(no_attribute(receiver, name)),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn call(builtin: Builtin, args: Vec<Value>) -> OpResult<Value>
    {
        call_builtin(builtin, args, &mut Vec::<u8>::new())
    }

    #[test]
    fn test_print_joins_with_spaces()
    {
        let mut out = Vec::new();
        call_builtin(Builtin::Print, vec![Value::str("Result:"), Value::Int(60)], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Result: 60\n");
    }

    #[test]
    fn test_conversions()
    {
        assert!(call(Builtin::Int, vec![Value::str(" 42 ")]).unwrap().equals(&Value::Int(42)));
        assert!(call(Builtin::Int, vec![Value::Float(-3.9)]).unwrap().equals(&Value::Int(-3)));
        let err = call(Builtin::Int, vec![Value::str("abc")]).unwrap_err();
        assert_eq!(err.message, "invalid literal for int() with base 10: 'abc'");
        assert!(call(Builtin::Float, vec![Value::str("2.5")]).unwrap().equals(&Value::Float(2.5)));
        assert_eq!(call(Builtin::Str, vec![Value::Float(2.0)]).unwrap().to_str().unwrap(), "2.0");
        assert_eq!(call(Builtin::Repr, vec![Value::str("a")]).unwrap().to_str().unwrap(), "'a'");
    }

    #[test]
    fn test_int_of_special_floats()
    {
        let err = call(Builtin::Int, vec![Value::Float(f64::INFINITY)]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::OverflowError);
        assert_eq!(err.message, "cannot convert float infinity to integer");

        let err = call(Builtin::Int, vec![Value::Float(f64::NAN)]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ValueError);
        assert_eq!(err.message, "cannot convert float NaN to integer");

        let err = call(Builtin::Int, vec![Value::Float(1e300)]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::OverflowError);
        assert!(call(Builtin::Int, vec![Value::Float(-9.2e18)]).unwrap().equals(&Value::Int(-9_200_000_000_000_000_000)));
    }

    #[test]
    fn test_len_and_arity_errors()
    {
        assert!(call(Builtin::Len, vec![Value::str("héllo")]).unwrap().equals(&Value::Int(5)));
        let err = call(Builtin::Len, vec![]).unwrap_err();
        assert_eq!(err.message, "len() takes exactly one argument (0 given)");
        let err = call(Builtin::Len, vec![Value::Int(3)]).unwrap_err();
        assert_eq!(err.message, "object of type 'int' has no len()");
    }

    #[test]
    fn test_min_max_sum()
    {
        let numbers = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert!(call(Builtin::Min, vec![numbers.clone()]).unwrap().equals(&Value::Int(1)));
        assert!(call(Builtin::Max, vec![Value::Int(1), Value::Float(2.5)]).unwrap().equals(&Value::Float(2.5)));
        assert!(call(Builtin::Sum, vec![numbers]).unwrap().equals(&Value::Int(6)));
        let err = call(Builtin::Max, vec![Value::list(Vec::new())]).unwrap_err();
        assert_eq!(err.message, "max() arg is an empty sequence");
    }

    #[test]
    fn test_range_rejects_zero_step()
    {
        let err = call(Builtin::Range, vec![Value::Int(0), Value::Int(5), Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ValueError);
    }

    #[test]
    fn test_exception_constructor()
    {
        let value = call(Builtin::Exception(ExceptionKind::ValueError), vec![Value::str("bad")]).unwrap();
        let Value::Exception(exc) = value else {
            panic!("expected an exception instance");
        };
        assert_eq!(exc.kind, ExceptionKind::ValueError);
        assert_eq!(exc.message, "bad");
    }

    #[test]
    fn test_list_methods()
    {
        let list = Value::list(Vec::new());
        call_method(&list, "append", vec![Value::Int(1)]).unwrap();
        call_method(&list, "append", vec![Value::Int(2)]).unwrap();
        assert!(call_method(&list, "pop", vec![]).unwrap().equals(&Value::Int(2)));
        assert_eq!(list.repr().unwrap(), "[1]");
        let err = call_method(&list, "sort", vec![]).unwrap_err();
        assert_eq!(err.message, "'list' object has no attribute 'sort'");
    }

    #[test]
    fn test_dict_methods()
    {
        let dict = Value::dict(vec![(Value::str("x"), Value::Int(1)), (Value::str("y"), Value::Int(2))]);
        let items = call_method(&dict, "items", vec![]).unwrap();
        assert_eq!(items.repr().unwrap(), "[('x', 1), ('y', 2)]");
        assert!(call_method(&dict, "get", vec![Value::str("z"), Value::Int(0)]).unwrap().equals(&Value::Int(0)));
        assert!(matches!(call_method(&dict, "get", vec![Value::str("z")]).unwrap(), Value::None));
    }

    #[test]
    fn test_string_methods()
    {
        let text = Value::str("  a,b,c  ");
        let stripped = call_method(&text, "strip", vec![]).unwrap();
        assert_eq!(stripped.to_str().unwrap(), "a,b,c");
        let parts = call_method(&stripped, "split", vec![Value::str(",")]).unwrap();
        assert_eq!(parts.repr().unwrap(), "['a', 'b', 'c']");
        let joined = call_method(&Value::str("-"), "join", vec![parts]).unwrap();
        assert_eq!(joined.to_str().unwrap(), "a-b-c");
        assert_eq!(call_method(&Value::str("Hi"), "upper", vec![]).unwrap().to_str().unwrap(), "HI");
    }
}
