//! Operators, indexing and iteration.
//!
//! Every fallible operation returns the script exception it raises; the
//! interpreter turns that into unwinding.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::ast::{BinOp, CmpOp, UnaryOp};
use crate::value::{
    Comparison, ExceptionKind, ExceptionValue, List, Number, Value, dict_insert, dict_lookup, format_float,
};

pub type OpResult<T> = Result<T, ExceptionValue>;

fn overflow() -> ExceptionValue
{
    ExceptionValue::new(ExceptionKind::OverflowError, "integer overflow")
}

fn zero_division(message: &str) -> ExceptionValue
{
    ExceptionValue::new(ExceptionKind::ZeroDivisionError, message)
}

fn unsupported(op: &str, a: &Value, b: &Value) -> ExceptionValue
{
    ExceptionValue::type_error(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        a.type_name(),
        b.type_name()
    ))
}

/// Number of elements in `range(start, stop, step)`.
#[must_use]
pub const fn range_len(start: i64, stop: i64, step: i64) -> i64
{
    if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> OpResult<Value>
{
    match (op, operand.as_number()) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!operand.truthy())),
        (UnaryOp::Neg, Some(Number::Int(i))) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Some(Number::Float(f))) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Some(Number::Int(i))) => Ok(Value::Int(i)),
        (UnaryOp::Pos, Some(Number::Float(f))) => Ok(Value::Float(f)),
        (UnaryOp::Neg | UnaryOp::Pos, None) => {
            let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
            Err(ExceptionValue::type_error(format!(
                "bad operand type for unary {symbol}: '{}'",
                operand.type_name()
            )))
        }
    }
}

fn repeat(items: &[Value], count: i64) -> Vec<Value>
{
    let count = usize::try_from(count).unwrap_or(0);
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend(items.iter().cloned());
    }
    out
}

pub fn binary(op: BinOp, a: &Value, b: &Value) -> OpResult<Value>
{
    match (op, a, b) {
        (BinOp::Add, Value::Str(x), Value::Str(y)) => return Ok(Value::Str(Rc::from(format!("{x}{y}")))),
        (BinOp::Add, Value::Str(_), other) => {
            return Err(ExceptionValue::type_error(format!(
                "can only concatenate str (not \"{}\") to str",
                other.type_name()
            )));
        }
        (BinOp::Add, Value::List(x), Value::List(y)) => {
            let mut items = x.borrow().clone();
            items.extend(y.borrow().iter().cloned());
            return Ok(Value::list(items));
        }
        (BinOp::Add, Value::Tuple(x), Value::Tuple(y)) => {
            let items: Vec<Value> = x.iter().chain(y.iter()).cloned().collect();
            return Ok(Value::tuple(items));
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            let count = usize::try_from(n.as_int().unwrap_or(0)).unwrap_or(0);
            return Ok(Value::Str(Rc::from(s.repeat(count))));
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items)) if n.as_int().is_some() => {
            return Ok(Value::list(repeat(&items.borrow(), n.as_int().unwrap_or(0))));
        }
        _ => {}
    }

    let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
        return Err(unsupported(op.symbol(), a, b));
    };
    match (x, y) {
        (Number::Int(x), Number::Int(y)) => int_binary(op, x, y),
        (x, y) => float_binary(op, x.as_f64(), y.as_f64()),
    }
}

fn int_binary(op: BinOp, x: i64, y: i64) -> OpResult<Value>
{
    let value = match op {
        BinOp::Add => x.checked_add(y).ok_or_else(overflow)?,
        BinOp::Sub => x.checked_sub(y).ok_or_else(overflow)?,
        BinOp::Mul => x.checked_mul(y).ok_or_else(overflow)?,
        BinOp::Div => {
            if y == 0 {
                return Err(zero_division("division by zero"));
            }
            return float_binary(op, Number::Int(x).as_f64(), Number::Int(y).as_f64());
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(zero_division("integer division or modulo by zero"));
            }
            let quotient = x.checked_div(y).ok_or_else(overflow)?;
            if (x % y != 0) && ((x < 0) != (y < 0)) { quotient - 1 } else { quotient }
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(zero_division("integer division or modulo by zero"));
            }
            let remainder = x.checked_rem(y).ok_or_else(overflow)?;
            if remainder != 0 && ((remainder < 0) != (y < 0)) { remainder + y } else { remainder }
        }
        BinOp::Pow => {
            if y < 0 {
                if x == 0 {
                    return Err(zero_division("0.0 cannot be raised to a negative power"));
                }
                return float_binary(op, Number::Int(x).as_f64(), Number::Int(y).as_f64());
            }
            let exponent = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_pow(exponent).ok_or_else(overflow)?
        }
    };
    Ok(Value::Int(value))
}

fn float_binary(op: BinOp, x: f64, y: f64) -> OpResult<Value>
{
    let value = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return Err(zero_division("float division by zero"));
            }
            x / y
        }
        BinOp::FloorDiv => {
            if y == 0.0 {
                return Err(zero_division("float floor division by zero"));
            }
            (x / y).floor()
        }
        BinOp::Mod => {
            if y == 0.0 {
                return Err(zero_division("float modulo"));
            }
            x - y * (x / y).floor()
        }
        BinOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(zero_division("0.0 cannot be raised to a negative power"));
            }
            x.powf(y)
        }
    };
    Ok(Value::Float(value))
}

/// Ordering for `<`, `min`, `max`; `None` if the types are not comparable.
///
/// # Errors
///
/// Raises `RecursionError` for containers that contain themselves.
pub fn ordering(a: &Value, b: &Value) -> OpResult<Option<Ordering>>
{
    Comparison::default().ordering(a, b)
}

pub fn compare(op: CmpOp, a: &Value, b: &Value) -> OpResult<bool>
{
    let ordered = |accept: fn(Ordering) -> bool| {
        ordering(a, b)?.map(accept).ok_or_else(|| {
            ExceptionValue::type_error(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op.symbol(),
                a.type_name(),
                b.type_name()
            ))
        })
    };
    match op {
        CmpOp::Eq => a.try_equals(b),
        CmpOp::NotEq => a.try_equals(b).map(|equal| !equal),
        CmpOp::Lt => ordered(Ordering::is_lt),
        CmpOp::LtE => ordered(Ordering::is_le),
        CmpOp::Gt => ordered(Ordering::is_gt),
        CmpOp::GtE => ordered(Ordering::is_ge),
        CmpOp::In => contains(b, a),
        CmpOp::NotIn => contains(b, a).map(|found| !found),
        CmpOp::Is => Ok(a.is(b)),
        CmpOp::IsNot => Ok(!a.is(b)),
    }
}

fn any_equal(items: &[Value], item: &Value) -> OpResult<bool>
{
    for candidate in items {
        if candidate.try_equals(item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `item in container`
pub fn contains(container: &Value, item: &Value) -> OpResult<bool>
{
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(ExceptionValue::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => any_equal(&items.borrow(), item),
        Value::Tuple(items) => any_equal(items, item),
        Value::Dict(entries) => Ok(dict_lookup(&entries.borrow(), item).is_some()),
        Value::Range { start, stop, step } => Ok(item.as_int().is_some_and(|i| {
            let in_bounds = if *step > 0 { *start <= i && i < *stop } else { *stop < i && i <= *start };
            in_bounds && (i - start) % step == 0
        })),
        other => Err(ExceptionValue::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Resolve a possibly negative index against `len`.
fn normalize_index(index: i64, len: usize) -> Option<usize>
{
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) { usize::try_from(index).ok() } else { None }
}

fn index_of(index: &Value, container: &str) -> OpResult<i64>
{
    index.as_int().ok_or_else(|| {
        ExceptionValue::type_error(format!(
            "{container} indices must be integers or slices, not {}",
            index.type_name()
        ))
    })
}

fn index_error(container: &str) -> ExceptionValue
{
    ExceptionValue::new(ExceptionKind::IndexError, format!("{container} index out of range"))
}

fn key_error(key: &Value) -> ExceptionValue
{
    let text = key.repr().unwrap_or_else(|_| key.type_name().to_string());
    ExceptionValue::new(ExceptionKind::KeyError, text)
}

fn check_hashable(key: &Value) -> OpResult<()>
{
    if key.is_hashable() {
        Ok(())
    } else {
        Err(ExceptionValue::type_error(format!("unhashable type: '{}'", key.type_name())))
    }
}

/// `object[index]`
pub fn get_item(object: &Value, index: &Value) -> OpResult<Value>
{
    match object {
        Value::List(items) => {
            let i = index_of(index, "list")?;
            let items = items.borrow();
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| index_error("list"))
        }
        Value::Tuple(items) => {
            let i = index_of(index, "tuple")?;
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| index_error("tuple"))
        }
        Value::Str(text) => {
            let i = index_of(index, "string")?;
            let chars: Vec<char> = text.chars().collect();
            normalize_index(i, chars.len())
                .map(|i| Value::str(&chars[i].to_string()))
                .ok_or_else(|| index_error("string"))
        }
        Value::Dict(entries) => {
            check_hashable(index)?;
            dict_lookup(&entries.borrow(), index).ok_or_else(|| key_error(index))
        }
        Value::Range { start, stop, step } => {
            let i = index_of(index, "range")?;
            let len = usize::try_from(range_len(*start, *stop, *step)).unwrap_or(0);
            normalize_index(i, len)
                .and_then(|i| i64::try_from(i).ok())
                .map(|i| Value::Int(start + i * step))
                .ok_or_else(|| ExceptionValue::new(ExceptionKind::IndexError, "range object index out of range"))
        }
        other => Err(ExceptionValue::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `object[index] = value`
pub fn set_item(object: &Value, index: &Value, value: Value) -> OpResult<()>
{
    match object {
        Value::List(items) => {
            let i = index_of(index, "list")?;
            let mut items = items.borrow_mut();
            let slot = normalize_index(i, items.len())
                .ok_or_else(|| ExceptionValue::new(ExceptionKind::IndexError, "list assignment index out of range"))?;
            items[slot] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            check_hashable(index)?;
            dict_insert(&mut entries.borrow_mut(), index.clone(), value);
            Ok(())
        }
        other => Err(ExceptionValue::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// Insert into a dict literal under construction.
pub fn dict_entry(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) -> OpResult<()>
{
    check_hashable(&key)?;
    dict_insert(entries, key, value);
    Ok(())
}

fn clamp_bound(bound: Option<i64>, len: usize, default: usize) -> usize
{
    let Some(bound) = bound else {
        return default;
    };
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if bound < 0 { (bound + len_i).max(0) } else { bound.min(len_i) };
    usize::try_from(resolved).unwrap_or(0)
}

/// `object[lower:upper]`
pub fn slice(object: &Value, lower: Option<i64>, upper: Option<i64>) -> OpResult<Value>
{
    let range = |len: usize| {
        let start = clamp_bound(lower, len, 0);
        let end = clamp_bound(upper, len, len);
        start..end.max(start)
    };
    match object {
        Value::List(items) => {
            let items = items.borrow();
            Ok(Value::list(items[range(items.len())].to_vec()))
        }
        Value::Tuple(items) => Ok(Value::tuple(items[range(items.len())].to_vec())),
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            let picked: String = chars[range(chars.len())].iter().collect();
            Ok(Value::str(&picked))
        }
        other => Err(ExceptionValue::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `len(value)`
pub fn len(value: &Value) -> OpResult<i64>
{
    let len = match value {
        Value::Str(text) => text.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(entries) => entries.borrow().len(),
        Value::Range { start, stop, step } => return Ok(range_len(*start, *stop, *step)),
        other => {
            return Err(ExceptionValue::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    i64::try_from(len).map_err(|_| overflow())
}

/// Lazy iteration used by `for` loops.
///
/// Lists are walked by index so appends made by the loop body are seen, the
/// way Python's list iterator behaves.
pub enum ValueIter
{
    List
    {
        items: List,
        next: usize,
    },
    Values(std::vec::IntoIter<Value>),
    Range
    {
        next: i64,
        stop: i64,
        step: i64,
    },
}

impl ValueIter
{
    pub fn new(value: &Value) -> OpResult<Self>
    {
        let iter = match value {
            Value::List(items) => Self::List {
                items: Rc::clone(items),
                next: 0,
            },
            Value::Tuple(items) => Self::Values(items.to_vec().into_iter()),
            Value::Str(text) => Self::Values(
                text.chars()
                    .map(|c| Value::str(&c.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            Value::Dict(entries) => Self::Values(
                entries
                    .borrow()
                    .iter()
                    .map(|(key, _)| key.clone())
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            Value::Range { start, stop, step } => Self::Range {
                next: *start,
                stop: *stop,
                step: *step,
            },
            other => {
                return Err(ExceptionValue::type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )));
            }
        };
        Ok(iter)
    }
}

impl Iterator for ValueIter
{
    type Item = Value;

    fn next(&mut self) -> Option<Value>
    {
        match self {
            Self::List { items, next } => {
                let item = items.borrow().get(*next).cloned()?;
                *next += 1;
                Some(item)
            }
            Self::Values(values) => values.next(),
            Self::Range { next, stop, step } => {
                let done = if *step > 0 { *next >= *stop } else { *next <= *stop };
                if done {
                    return None;
                }
                let item = *next;
                *next = next.checked_add(*step).unwrap_or(*stop);
                Some(Value::Int(item))
            }
        }
    }
}

/// Collect every element of an iterable.
pub fn collect(value: &Value) -> OpResult<Vec<Value>>
{
    Ok(ValueIter::new(value)?.collect())
}

/// Apply an f-string format spec: `[[fill]align][width][.precision][type]`.
pub fn format_spec(value: &Value, text: String, spec: &str) -> OpResult<String>
{
    let invalid = || ExceptionValue::value_error(format!("Invalid format specifier '{spec}'"));
    let chars: Vec<char> = spec.chars().collect();
    let mut i = 0;

    let is_align = |c: char| matches!(c, '<' | '>' | '^');
    let (fill, align) = match (chars.first(), chars.get(1)) {
        (Some(&fill), Some(&align)) if is_align(align) => {
            i = 2;
            (fill, Some(align))
        }
        (Some(&align), _) if is_align(align) => {
            i = 1;
            (' ', Some(align))
        }
        _ => (' ', None),
    };
    let (fill, align) = if align.is_none() && chars.get(i) == Some(&'0') {
        i += 1;
        ('0', Some('>'))
    } else {
        (fill, align)
    };

    let digits = |i: &mut usize| {
        let start = *i;
        while chars.get(*i).is_some_and(char::is_ascii_digit) {
            *i += 1;
        }
        chars[start..*i].iter().collect::<String>().parse::<usize>().ok()
    };
    let width = digits(&mut i);
    let precision = if chars.get(i) == Some(&'.') {
        i += 1;
        Some(digits(&mut i).ok_or_else(invalid)?)
    } else {
        None
    };
    let kind = chars.get(i).copied();
    if i + usize::from(kind.is_some()) != chars.len() {
        return Err(invalid());
    }

    let number = value.as_number().filter(|_| !matches!(value, Value::Bool(_)) || kind.is_some());
    let body = match (kind, number) {
        (Some('f'), Some(n)) => format!("{:.*}", precision.unwrap_or(6), n.as_f64()),
        (Some('e'), Some(n)) => format!("{:.*e}", precision.unwrap_or(6), n.as_f64()),
        (Some('%'), Some(n)) => format!("{:.*}%", precision.unwrap_or(6), n.as_f64() * 100.0),
        (Some('d'), Some(Number::Int(n))) => n.to_string(),
        (None, Some(Number::Float(f))) if precision.is_some() => format!("{:.*}", precision.unwrap_or(0), f),
        (None, Some(Number::Float(f))) => format_float(f),
        (None | Some('s'), _) => match precision {
            Some(p) if matches!(value, Value::Str(_)) => text.chars().take(p).collect(),
            _ => text,
        },
        _ => return Err(invalid()),
    };

    let Some(width) = width else {
        return Ok(body);
    };
    let len = body.chars().count();
    if len >= width {
        return Ok(body);
    }
    let pad = width - len;
    let default_align = if number.is_some() { '>' } else { '<' };
    let padding = |n: usize| fill.to_string().repeat(n);
    Ok(match align.unwrap_or(default_align) {
        '>' => format!("{}{body}", padding(pad)),
        '^' => format!("{}{body}{}", padding(pad / 2), padding(pad - pad / 2)),
        _ => format!("{body}{}", padding(pad)),
    })
}
