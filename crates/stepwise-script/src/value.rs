//! Runtime values and their display forms.
//!
//! Lists and dicts are shared by reference (`Rc<RefCell<..>>`), so a list can
//! end up containing itself. The script-facing `repr` prints such a cycle as
//! `[...]`; the debugger-facing [`Displayable`] rendering refuses it instead
//! and lets the snapshot builder fall back to its placeholder.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use stepwise_core::{Displayable, RenderError};

use crate::ast::FunctionDef;

/// Built-in exception classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind
{
    Exception,
    ArithmeticError,
    LookupError,
    AttributeError,
    IndexError,
    KeyError,
    NameError,
    OSError,
    OverflowError,
    RecursionError,
    RuntimeError,
    TypeError,
    ValueError,
    ZeroDivisionError,
}

impl ExceptionKind
{
    pub const ALL: [Self; 14] = [
        Self::Exception,
        Self::ArithmeticError,
        Self::LookupError,
        Self::AttributeError,
        Self::IndexError,
        Self::KeyError,
        Self::NameError,
        Self::OSError,
        Self::OverflowError,
        Self::RecursionError,
        Self::RuntimeError,
        Self::TypeError,
        Self::ValueError,
        Self::ZeroDivisionError,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str
    {
        match self {
            Self::Exception => "Exception",
            Self::ArithmeticError => "ArithmeticError",
            Self::LookupError => "LookupError",
            Self::AttributeError => "AttributeError",
            Self::IndexError => "IndexError",
            Self::KeyError => "KeyError",
            Self::NameError => "NameError",
            Self::OSError => "OSError",
            Self::OverflowError => "OverflowError",
            Self::RecursionError => "RecursionError",
            Self::RuntimeError => "RuntimeError",
            Self::TypeError => "TypeError",
            Self::ValueError => "ValueError",
            Self::ZeroDivisionError => "ZeroDivisionError",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self>
    {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    const fn parent(self) -> Option<Self>
    {
        match self {
            Self::Exception => None,
            Self::IndexError | Self::KeyError => Some(Self::LookupError),
            Self::OverflowError | Self::ZeroDivisionError => Some(Self::ArithmeticError),
            Self::RecursionError => Some(Self::RuntimeError),
            _ => Some(Self::Exception),
        }
    }

    /// Whether an `except base:` clause catches this kind.
    #[must_use]
    pub fn is_subclass_of(self, base: Self) -> bool
    {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == base {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

/// A raised (or constructed) exception instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionValue
{
    pub kind: ExceptionKind,
    pub message: String,
}

impl ExceptionValue
{
    #[must_use]
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self
    {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self
    {
        Self::new(ExceptionKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self
    {
        Self::new(ExceptionKind::ValueError, message)
    }

    /// Text shown to the operator: the message, or the class name when the
    /// exception was raised without one.
    #[must_use]
    pub fn display_text(&self) -> String
    {
        if self.message.is_empty() {
            self.kind.name().to_string()
        } else {
            self.message.clone()
        }
    }
}

impl fmt::Display for ExceptionValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.message.is_empty() {
            f.write_str(self.kind.name())
        } else {
            write!(f, "{}: {}", self.kind.name(), self.message)
        }
    }
}

/// Callable built into the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin
{
    Print,
    Len,
    Range,
    Str,
    Repr,
    Int,
    Float,
    Abs,
    Min,
    Max,
    Sum,
    /// Exception class; calling it constructs an instance.
    Exception(ExceptionKind),
}

impl Builtin
{
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self>
    {
        let builtin = match name {
            "print" => Self::Print,
            "len" => Self::Len,
            "range" => Self::Range,
            "str" => Self::Str,
            "repr" => Self::Repr,
            "int" => Self::Int,
            "float" => Self::Float,
            "abs" => Self::Abs,
            "min" => Self::Min,
            "max" => Self::Max,
            "sum" => Self::Sum,
            other => return ExceptionKind::from_name(other).map(Self::Exception),
        };
        Some(builtin)
    }

    #[must_use]
    pub const fn name(self) -> &'static str
    {
        match self {
            Self::Print => "print",
            Self::Len => "len",
            Self::Range => "range",
            Self::Str => "str",
            Self::Repr => "repr",
            Self::Int => "int",
            Self::Float => "float",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Exception(kind) => kind.name(),
        }
    }
}

/// A user-defined function together with its evaluated defaults
#[derive(Debug)]
pub struct Function
{
    pub def: Rc<FunctionDef>,
    /// Defaults for the trailing parameters, evaluated at definition time.
    pub defaults: Vec<Value>,
}

pub type List = Rc<RefCell<Vec<Value>>>;
/// Insertion-ordered key/value pairs.
pub type Dict = Rc<RefCell<Vec<(Value, Value)>>>;

#[derive(Debug, Clone)]
pub enum Value
{
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(List),
    Tuple(Rc<[Value]>),
    Dict(Dict),
    Range
    {
        start: i64,
        stop: i64,
        step: i64,
    },
    Function(Rc<Function>),
    Builtin(Builtin),
    Exception(Rc<ExceptionValue>),
}

impl Value
{
    pub fn str(text: &str) -> Self
    {
        Self::Str(Rc::from(text))
    }

    pub fn list(items: Vec<Self>) -> Self
    {
        Self::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Self>) -> Self
    {
        Self::Tuple(Rc::from(items))
    }

    pub fn dict(entries: Vec<(Self, Self)>) -> Self
    {
        Self::Dict(Rc::new(RefCell::new(entries)))
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str
    {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Range { .. } => "range",
            Self::Function(_) => "function",
            Self::Builtin(Builtin::Exception(_)) => "type",
            Self::Builtin(_) => "builtin_function_or_method",
            Self::Exception(exc) => exc.kind.name(),
        }
    }

    #[must_use]
    pub fn truthy(&self) -> bool
    {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::Dict(entries) => !entries.borrow().is_empty(),
            Self::Range { start, stop, step } => crate::ops::range_len(*start, *stop, *step) > 0,
            Self::Function(_) | Self::Builtin(_) | Self::Exception(_) => true,
        }
    }

    /// Whether the value may be used as a dict key.
    #[must_use]
    pub fn is_hashable(&self) -> bool
    {
        match self {
            Self::List(_) | Self::Dict(_) => false,
            Self::Tuple(items) => items.iter().all(Self::is_hashable),
            _ => true,
        }
    }

    /// Python `==`.
    ///
    /// # Errors
    ///
    /// Raises `RecursionError` when nested containers lead back to a pair
    /// already being compared, or nest too deeply.
    pub fn try_equals(&self, other: &Self) -> Result<bool, ExceptionValue>
    {
        Comparison::default().equals(self, other)
    }

    /// `==` for values that cannot contain themselves, such as dict keys.
    ///
    /// A comparison that would raise counts as unequal.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool
    {
        self.try_equals(other).unwrap_or(false)
    }

    /// `==` on everything but containers.
    fn scalar_equals(&self, other: &Self) -> bool
    {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (
                Self::Range { start, stop, step },
                Self::Range {
                    start: s2,
                    stop: e2,
                    step: st2,
                },
            ) => start == s2 && stop == e2 && step == st2,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Exception(a), Self::Exception(b)) => Rc::ptr_eq(a, b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            },
        }
    }

    /// Python `is`.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool
    {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => Rc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Tuple(a), Self::Tuple(b)) => Rc::ptr_eq(a, b),
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Exception(a), Self::Exception(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) const fn as_number(&self) -> Option<Number>
    {
        match self {
            Self::Bool(b) => Some(Number::Int(*b as i64)),
            Self::Int(i) => Some(Number::Int(*i)),
            Self::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    /// Integer view used for indices and counts (`bool` counts as `int`).
    pub(crate) const fn as_int(&self) -> Option<i64>
    {
        match self {
            Self::Bool(b) => Some(*b as i64),
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Script-level `repr()`. Cycles print as `[...]` / `{...}`.
    ///
    /// # Errors
    ///
    /// Fails only if a container is being mutated while it is printed.
    pub fn repr(&self) -> Result<String, RenderError>
    {
        let mut out = String::new();
        Printer::new(true).write(self, &mut out)?;
        Ok(out)
    }

    /// Script-level `str()`.
    ///
    /// # Errors
    ///
    /// Same as [`Value::repr`].
    pub fn to_str(&self) -> Result<String, RenderError>
    {
        match self {
            Self::Str(s) => Ok(s.to_string()),
            Self::Exception(exc) => Ok(exc.message.clone()),
            other => other.repr(),
        }
    }
}

impl Displayable for Value
{
    fn render(&self) -> Result<String, RenderError>
    {
        let mut out = String::new();
        Printer::new(false).write(self, &mut out)?;
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number
{
    Int(i64),
    Float(f64),
}

impl Number
{
    #[allow(clippy::cast_precision_loss)]
    pub(crate) const fn as_f64(self) -> f64
    {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

/// Deepest container nesting `==` and ordering will follow.
const MAX_COMPARISON_DEPTH: usize = 1000;

/// Recursive `==` and ordering with a guard on the container pairs in
/// progress.
#[derive(Default)]
pub(crate) struct Comparison
{
    active: Vec<(*const (), *const ())>,
}

impl Comparison
{
    fn enter(&mut self, a: *const (), b: *const ()) -> Result<(), ExceptionValue>
    {
        if self.active.len() >= MAX_COMPARISON_DEPTH || self.active.contains(&(a, b)) {
            return Err(ExceptionValue::new(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded in comparison",
            ));
        }
        self.active.push((a, b));
        Ok(())
    }

    pub(crate) fn equals(&mut self, a: &Value, b: &Value) -> Result<bool, ExceptionValue>
    {
        match (a, b) {
            (Value::List(x), Value::List(y)) => {
                if Rc::ptr_eq(x, y) {
                    return Ok(true);
                }
                self.enter(Rc::as_ptr(x).cast(), Rc::as_ptr(y).cast())?;
                let equal = self.sequences_equal(&x.borrow(), &y.borrow());
                self.active.pop();
                equal
            }
            (Value::Tuple(x), Value::Tuple(y)) => {
                self.enter(Rc::as_ptr(x).cast(), Rc::as_ptr(y).cast())?;
                let equal = self.sequences_equal(x, y);
                self.active.pop();
                equal
            }
            (Value::Dict(x), Value::Dict(y)) => {
                if Rc::ptr_eq(x, y) {
                    return Ok(true);
                }
                self.enter(Rc::as_ptr(x).cast(), Rc::as_ptr(y).cast())?;
                let equal = self.dicts_equal(&x.borrow(), &y.borrow());
                self.active.pop();
                equal
            }
            _ => Ok(a.scalar_equals(b)),
        }
    }

    fn sequences_equal(&mut self, a: &[Value], b: &[Value]) -> Result<bool, ExceptionValue>
    {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (x, y) in a.iter().zip(b) {
            if !self.equals(x, y)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn dicts_equal(&mut self, a: &[(Value, Value)], b: &[(Value, Value)]) -> Result<bool, ExceptionValue>
    {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (key, value) in a {
            let Some(other) = dict_lookup(b, key) else {
                return Ok(false);
            };
            if !self.equals(value, &other)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `None` if the two values are not comparable.
    pub(crate) fn ordering(&mut self, a: &Value, b: &Value) -> Result<Option<Ordering>, ExceptionValue>
    {
        match (a, b) {
            (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
            (Value::List(x), Value::List(y)) => {
                self.enter(Rc::as_ptr(x).cast(), Rc::as_ptr(y).cast())?;
                let order = self.sequence_ordering(&x.borrow(), &y.borrow());
                self.active.pop();
                order
            }
            (Value::Tuple(x), Value::Tuple(y)) => {
                self.enter(Rc::as_ptr(x).cast(), Rc::as_ptr(y).cast())?;
                let order = self.sequence_ordering(x, y);
                self.active.pop();
                order
            }
            _ => Ok(match (a.as_number(), b.as_number()) {
                (Some(Number::Int(x)), Some(Number::Int(y))) => Some(x.cmp(&y)),
                (Some(x), Some(y)) => x.as_f64().partial_cmp(&y.as_f64()),
                _ => None,
            }),
        }
    }

    fn sequence_ordering(&mut self, a: &[Value], b: &[Value]) -> Result<Option<Ordering>, ExceptionValue>
    {
        for (x, y) in a.iter().zip(b) {
            if !self.equals(x, y)? {
                return self.ordering(x, y);
            }
        }
        Ok(Some(a.len().cmp(&b.len())))
    }
}

/// Find `key` in an insertion-ordered dict body.
pub(crate) fn dict_lookup(entries: &[(Value, Value)], key: &Value) -> Option<Value>
{
    entries
        .iter()
        .find(|(existing, _)| existing.equals(key))
        .map(|(_, value)| value.clone())
}

/// Insert or replace `key`, keeping the original position on replace.
pub(crate) fn dict_insert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value)
{
    if let Some(slot) = entries.iter_mut().find(|(existing, _)| existing.equals(&key)) {
        slot.1 = value;
    } else {
        entries.push((key, value));
    }
}

/// Python float repr: `1.0`, `0.1`, `1e+20`, `inf`.
#[must_use]
pub fn format_float(value: f64) -> String
{
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{value:e}");
        return match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = exponent.strip_prefix('-').map_or(("+", exponent), |rest| ("-", rest));
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => text,
        };
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Python string repr with the quote style Python would pick.
#[must_use]
pub fn quote(text: &str) -> String
{
    let quote = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Recursive repr writer with cycle detection.
struct Printer
{
    active: Vec<*const ()>,
    elide_cycles: bool,
}

impl Printer
{
    const fn new(elide_cycles: bool) -> Self
    {
        Self {
            active: Vec::new(),
            elide_cycles,
        }
    }

    fn enter(&mut self, id: *const (), elided: &str, out: &mut String) -> Result<bool, RenderError>
    {
        if !self.active.contains(&id) {
            self.active.push(id);
            return Ok(true);
        }
        if self.elide_cycles {
            out.push_str(elided);
            Ok(false)
        } else {
            Err(RenderError::SelfReferential)
        }
    }

    fn write(&mut self, value: &Value, out: &mut String) -> Result<(), RenderError>
    {
        match value {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Str(s) => out.push_str(&quote(s)),
            Value::List(items) => {
                if !self.enter(Rc::as_ptr(items).cast(), "[...]", out)? {
                    return Ok(());
                }
                let items = items
                    .try_borrow()
                    .map_err(|_| RenderError::Unavailable("list is being modified".to_string()))?;
                out.push('[');
                self.write_items(&items, out)?;
                out.push(']');
                self.active.pop();
            }
            Value::Tuple(items) => {
                out.push('(');
                self.write_items(items, out)?;
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Value::Dict(entries) => {
                if !self.enter(Rc::as_ptr(entries).cast(), "{...}", out)? {
                    return Ok(());
                }
                let entries = entries
                    .try_borrow()
                    .map_err(|_| RenderError::Unavailable("dict is being modified".to_string()))?;
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write(key, out)?;
                    out.push_str(": ");
                    self.write(value, out)?;
                }
                out.push('}');
                self.active.pop();
            }
            Value::Range { start, stop, step } => {
                if *step == 1 {
                    out.push_str(&format!("range({start}, {stop})"));
                } else {
                    out.push_str(&format!("range({start}, {stop}, {step})"));
                }
            }
            Value::Function(function) => out.push_str(&format!("<function {}>", function.def.name)),
            Value::Builtin(Builtin::Exception(kind)) => out.push_str(&format!("<class '{}'>", kind.name())),
            Value::Builtin(builtin) => out.push_str(&format!("<built-in function {}>", builtin.name())),
            Value::Exception(exc) => {
                out.push_str(exc.kind.name());
                out.push('(');
                if !exc.message.is_empty() {
                    out.push_str(&quote(&exc.message));
                }
                out.push(')');
            }
        }
        Ok(())
    }

    fn write_items(&mut self, items: &[Value], out: &mut String) -> Result<(), RenderError>
    {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write(item, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_repr_matches_python()
    {
        let value = Value::list(vec![
            Value::Int(1),
            Value::Float(2.0),
            Value::str("it's"),
            Value::None,
            Value::tuple(vec![Value::Bool(true)]),
            Value::dict(vec![(Value::str("x"), Value::Float(0.5))]),
        ]);
        assert_eq!(value.repr().unwrap(), "[1, 2.0, \"it's\", None, (True,), {'x': 0.5}]");
    }

    #[test]
    fn test_str_of_string_is_unquoted()
    {
        assert_eq!(Value::str("Hello").to_str().unwrap(), "Hello");
        assert_eq!(Value::str("Hello").repr().unwrap(), "'Hello'");
    }

    #[test]
    fn test_float_formatting()
    {
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_self_referential_list()
    {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }

        assert_eq!(list.repr().unwrap(), "[1, [...]]");
        assert_eq!(list.render(), Err(RenderError::SelfReferential));
    }

    #[test]
    fn test_shared_but_acyclic_list_renders()
    {
        let inner = Value::list(vec![Value::Int(7)]);
        let outer = Value::list(vec![inner.clone(), inner]);
        assert_eq!(outer.render().unwrap(), "[[7], [7]]");
    }

    #[test]
    fn test_equality_across_numeric_types()
    {
        assert!(Value::Int(1).equals(&Value::Float(1.0)));
        assert!(Value::Bool(true).equals(&Value::Int(1)));
        assert!(!Value::str("1").equals(&Value::Int(1)));
        assert!(Value::tuple(vec![Value::Int(1)]).equals(&Value::tuple(vec![Value::Float(1.0)])));
    }

    #[test]
    fn test_self_containing_lists_raise_recursion_error()
    {
        let a = Value::list(Vec::new());
        let b = Value::list(Vec::new());
        for value in [&a, &b] {
            let Value::List(items) = value else { unreachable!() };
            items.borrow_mut().push(value.clone());
        }

        let err = a.try_equals(&b).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::RecursionError);
        assert_eq!(err.message, "maximum recursion depth exceeded in comparison");
        assert!(a.try_equals(&a).unwrap());
        assert!(!a.equals(&b));

        let err = Comparison::default().ordering(&a, &b).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::RecursionError);
    }

    #[test]
    fn test_nested_containers_compare_by_value()
    {
        let left = Value::dict(vec![(Value::str("k"), Value::list(vec![Value::Int(1), Value::tuple(vec![])]))]);
        let right = Value::dict(vec![(Value::str("k"), Value::list(vec![Value::Float(1.0), Value::tuple(vec![])]))]);
        assert!(left.try_equals(&right).unwrap());

        let shorter = Value::list(vec![Value::Int(1)]);
        let longer = Value::list(vec![Value::Int(1), Value::Int(0)]);
        assert_eq!(Comparison::default().ordering(&shorter, &longer).unwrap(), Some(Ordering::Less));
    }

    #[test]
    fn test_exception_hierarchy()
    {
        assert!(ExceptionKind::KeyError.is_subclass_of(ExceptionKind::LookupError));
        assert!(ExceptionKind::KeyError.is_subclass_of(ExceptionKind::Exception));
        assert!(!ExceptionKind::KeyError.is_subclass_of(ExceptionKind::ValueError));
        assert_eq!(Builtin::from_name("ValueError"), Some(Builtin::Exception(ExceptionKind::ValueError)));
    }

    #[test]
    fn test_exception_display_text()
    {
        assert_eq!(ExceptionValue::new(ExceptionKind::Exception, "boom").display_text(), "boom");
        assert_eq!(ExceptionValue::new(ExceptionKind::ValueError, "").display_text(), "ValueError");
        assert_eq!(
            Value::Exception(Rc::new(ExceptionValue::new(ExceptionKind::ValueError, "bad"))).repr().unwrap(),
            "ValueError('bad')"
        );
    }
}
