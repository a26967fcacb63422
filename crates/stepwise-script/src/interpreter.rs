//! Tree-walking interpreter with statement-level trace hooks.
//!
//! Before every statement the current frame's line is updated and the hook's
//! `on_line` runs. When an exception leaves a frame (a function body or the
//! module itself), `on_exception` runs with that frame. A `Terminate` answer
//! unwinds with [`Unwind::Terminated`], which no `except` clause can catch.

use std::io::Write;
use std::rc::Rc;

use stepwise_core::{Flow, TargetFailure, TraceHook};
use tracing::debug;

use crate::ast::{BinOp, Expr, FStringPart, Handler, Program, Stmt, StmtKind, Target};
use crate::builtins;
use crate::frame::Frame;
use crate::ops::{self, ValueIter};
use crate::value::{Builtin, ExceptionKind, ExceptionValue, Function, Value};

/// Deepest call chain allowed before `RecursionError`.
pub const MAX_CALL_DEPTH: usize = 200;

/// Non-local control flow
#[derive(Debug)]
pub enum Unwind
{
    Raise(Rc<ExceptionValue>),
    Return(Value),
    Break,
    Continue,
    /// The operator asked to stop. Not catchable by scripts.
    Terminated,
}

impl From<ExceptionValue> for Unwind
{
    fn from(exception: ExceptionValue) -> Self
    {
        Self::Raise(Rc::new(exception))
    }
}

type Exec<T> = Result<T, Unwind>;

pub struct Interpreter<'a>
{
    file: Rc<str>,
    hook: &'a mut dyn TraceHook,
    output: &'a mut dyn Write,
    /// Exceptions currently being handled, innermost last (for bare `raise`).
    handling: Vec<Rc<ExceptionValue>>,
}

impl<'a> Interpreter<'a>
{
    pub fn new(file: &str, hook: &'a mut dyn TraceHook, output: &'a mut dyn Write) -> Self
    {
        Self {
            file: Rc::from(file),
            hook,
            output,
            handling: Vec::new(),
        }
    }

    /// Execute a program in a fresh module namespace.
    ///
    /// # Errors
    ///
    /// Returns [`TargetFailure::Terminated`] when the hook asked to stop and
    /// [`TargetFailure::Raised`] when an exception escaped the module.
    pub fn run(&mut self, program: &Program) -> Result<(), TargetFailure>
    {
        let module = Frame::module(Rc::clone(&self.file));
        module.set("__name__", Value::str("__main__"));
        module.set("__file__", Value::str(&self.file));

        match self.exec_block(&module, &program.body) {
            Ok(()) | Err(Unwind::Return(_) | Unwind::Break | Unwind::Continue) => Ok(()),
            Err(Unwind::Terminated) => Err(TargetFailure::Terminated),
            Err(Unwind::Raise(exception)) => {
                let text = exception.display_text();
                debug!(%exception, "Exception escaped the module");
                match self.hook.on_exception(&module, &text) {
                    Flow::Proceed => Err(TargetFailure::Raised(text)),
                    Flow::Terminate => Err(TargetFailure::Terminated),
                }
            }
        }
    }

    fn trace(&mut self, frame: &Frame<'_>, line: u32) -> Exec<()>
    {
        frame.set_line(line);
        match self.hook.on_line(frame) {
            Flow::Proceed => Ok(()),
            Flow::Terminate => Err(Unwind::Terminated),
        }
    }

    fn exec_block(&mut self, frame: &Frame<'_>, body: &[Stmt]) -> Exec<()>
    {
        for stmt in body {
            self.exec(frame, stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, frame: &Frame<'_>, stmt: &Stmt) -> Exec<()>
    {
        self.trace(frame, stmt.line)?;

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(frame, expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(frame, value)?;
                for target in targets {
                    self.assign(frame, target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.aug_assign(frame, target, *op, value)?,
            StmtKind::If { branches, orelse } => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        self.trace(frame, branch.line)?;
                    }
                    if self.eval(frame, &branch.cond)?.truthy() {
                        return self.exec_block(frame, &branch.body);
                    }
                }
                if let Some(body) = orelse {
                    self.exec_block(frame, body)?;
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval(frame, cond)?.truthy() {
                    match self.exec_block(frame, body) {
                        Ok(()) | Err(Unwind::Continue) => {}
                        Err(Unwind::Break) => break,
                        Err(other) => return Err(other),
                    }
                    self.trace(frame, stmt.line)?;
                }
            }
            StmtKind::For { target, iter, body } => {
                let iterable = self.eval(frame, iter)?;
                for item in ValueIter::new(&iterable)? {
                    self.assign(frame, target, item)?;
                    match self.exec_block(frame, body) {
                        Ok(()) | Err(Unwind::Continue) => {}
                        Err(Unwind::Break) => break,
                        Err(other) => return Err(other),
                    }
                    self.trace(frame, stmt.line)?;
                }
            }
            StmtKind::Break => return Err(Unwind::Break),
            StmtKind::Continue => return Err(Unwind::Continue),
            StmtKind::Pass => {}
            StmtKind::FunctionDef(def) => {
                let defaults = def
                    .params
                    .iter()
                    .filter_map(|param| param.default.as_ref())
                    .map(|default| self.eval(frame, default))
                    .collect::<Exec<Vec<_>>>()?;
                let function = Function {
                    def: Rc::clone(def),
                    defaults,
                };
                frame.set(&def.name, Value::Function(Rc::new(function)));
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(frame, expr)?,
                    None => Value::None,
                };
                return Err(Unwind::Return(value));
            }
            StmtKind::Raise(value) => return Err(self.raise(frame, value.as_ref())),
            StmtKind::Try { body, handlers } => return self.exec_try(frame, body, handlers),
        }
        Ok(())
    }

    fn raise(&mut self, frame: &Frame<'_>, value: Option<&Expr>) -> Unwind
    {
        let Some(expr) = value else {
            return match self.handling.last() {
                Some(exception) => Unwind::Raise(Rc::clone(exception)),
                None => ExceptionValue::new(ExceptionKind::RuntimeError, "No active exception to reraise").into(),
            };
        };
        match self.eval(frame, expr) {
            Ok(Value::Exception(exception)) => Unwind::Raise(exception),
            Ok(Value::Builtin(Builtin::Exception(kind))) => ExceptionValue::new(kind, "").into(),
            Ok(_) => ExceptionValue::type_error("exceptions must derive from BaseException").into(),
            Err(unwind) => unwind,
        }
    }

    fn exec_try(&mut self, frame: &Frame<'_>, body: &[Stmt], handlers: &[Handler]) -> Exec<()>
    {
        let exception = match self.exec_block(frame, body) {
            Err(Unwind::Raise(exception)) => exception,
            other => return other,
        };

        for handler in handlers {
            self.trace(frame, handler.line)?;
            if !self.handler_matches(frame, handler, &exception)? {
                continue;
            }
            if let Some(name) = &handler.name {
                frame.set(name, Value::Exception(Rc::clone(&exception)));
            }
            self.handling.push(Rc::clone(&exception));
            let result = self.exec_block(frame, &handler.body);
            self.handling.pop();
            if let Some(name) = &handler.name {
                frame.remove(name);
            }
            return result;
        }
        Err(Unwind::Raise(exception))
    }

    fn handler_matches(&mut self, frame: &Frame<'_>, handler: &Handler, exception: &ExceptionValue) -> Exec<bool>
    {
        let Some(kind) = &handler.kind else {
            return Ok(true);
        };
        let class = self.eval(frame, kind)?;
        let classes = match &class {
            Value::Tuple(items) => items.to_vec(),
            other => vec![other.clone()],
        };
        let mut matched = false;
        for class in classes {
            let Value::Builtin(Builtin::Exception(base)) = class else {
                return Err(ExceptionValue::type_error(
                    "catching classes that do not inherit from BaseException is not allowed",
                )
                .into());
            };
            matched |= exception.kind.is_subclass_of(base);
        }
        Ok(matched)
    }

    fn assign(&mut self, frame: &Frame<'_>, target: &Target, value: Value) -> Exec<()>
    {
        match target {
            Target::Name(name) => frame.set(name, value),
            Target::Subscript { object, index } => {
                let object = self.eval(frame, object)?;
                let index = self.eval(frame, index)?;
                ops::set_item(&object, &index, value)?;
            }
            Target::Unpack(targets) => {
                let values = ops::collect(&value).map_err(|_| {
                    ExceptionValue::type_error(format!(
                        "cannot unpack non-iterable {} object",
                        value.type_name()
                    ))
                })?;
                if values.len() < targets.len() {
                    return Err(ExceptionValue::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        values.len()
                    ))
                    .into());
                }
                if values.len() > targets.len() {
                    return Err(ExceptionValue::value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    ))
                    .into());
                }
                for (target, value) in targets.iter().zip(values) {
                    self.assign(frame, target, value)?;
                }
            }
        }
        Ok(())
    }

    fn aug_assign(&mut self, frame: &Frame<'_>, target: &Target, op: BinOp, value: &Expr) -> Exec<()>
    {
        match target {
            Target::Name(name) => {
                let current = self.lookup(frame, name)?;
                let rhs = self.eval(frame, value)?;
                let updated = Self::augmented(op, &current, &rhs)?;
                frame.set(name, updated);
            }
            Target::Subscript { object, index } => {
                let object = self.eval(frame, object)?;
                let index = self.eval(frame, index)?;
                let current = ops::get_item(&object, &index)?;
                let rhs = self.eval(frame, value)?;
                let updated = Self::augmented(op, &current, &rhs)?;
                ops::set_item(&object, &index, updated)?;
            }
            Target::Unpack(_) => {
                return Err(ExceptionValue::new(
                    ExceptionKind::RuntimeError,
                    "illegal expression for augmented assignment",
                )
                .into());
            }
        }
        Ok(())
    }

    /// `a op= b`; lists extend in place.
    fn augmented(op: BinOp, current: &Value, rhs: &Value) -> Exec<Value>
    {
        if let (BinOp::Add, Value::List(items)) = (op, current) {
            let extra = ops::collect(rhs)?;
            items.borrow_mut().extend(extra);
            return Ok(current.clone());
        }
        Ok(ops::binary(op, current, rhs)?)
    }

    fn lookup(&self, frame: &Frame<'_>, name: &str) -> Exec<Value>
    {
        frame
            .get(name)
            .or_else(|| frame.globals().get(name))
            .or_else(|| Builtin::from_name(name).map(Value::Builtin))
            .ok_or_else(|| ExceptionValue::new(ExceptionKind::NameError, format!("name '{name}' is not defined")).into())
    }

    fn eval_all(&mut self, frame: &Frame<'_>, exprs: &[Expr]) -> Exec<Vec<Value>>
    {
        exprs.iter().map(|expr| self.eval(frame, expr)).collect()
    }

    fn eval_int(&mut self, frame: &Frame<'_>, expr: Option<&Expr>) -> Exec<Option<i64>>
    {
        let Some(expr) = expr else {
            return Ok(None);
        };
        match self.eval(frame, expr)? {
            Value::None => Ok(None),
            value => value.as_int().map(Some).ok_or_else(|| {
                ExceptionValue::type_error("slice indices must be integers or None").into()
            }),
        }
    }

    fn eval(&mut self, frame: &Frame<'_>, expr: &Expr) -> Exec<Value>
    {
        let value = match expr {
            Expr::None => Value::None,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Int(i) => Value::Int(*i),
            Expr::Float(f) => Value::Float(*f),
            Expr::Str(s) => Value::Str(Rc::clone(s)),
            Expr::FString(parts) => Value::str(&self.fstring(frame, parts)?),
            Expr::Name(name) => self.lookup(frame, name)?,
            Expr::List(items) => Value::list(self.eval_all(frame, items)?),
            Expr::Tuple(items) => Value::tuple(self.eval_all(frame, items)?),
            Expr::Dict(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(frame, key)?;
                    let value = self.eval(frame, value)?;
                    ops::dict_entry(&mut pairs, key, value)?;
                }
                Value::dict(pairs)
            }
            Expr::Unary(op, operand) => {
                let operand = self.eval(frame, operand)?;
                ops::unary(*op, &operand)?
            }
            Expr::Binary(left, op, right) => {
                let left = self.eval(frame, left)?;
                let right = self.eval(frame, right)?;
                ops::binary(*op, &left, &right)?
            }
            Expr::Compare(first, rest) => {
                let mut left = self.eval(frame, first)?;
                for (op, right) in rest {
                    let right = self.eval(frame, right)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Value::Bool(true)
            }
            Expr::And(left, right) => {
                let left = self.eval(frame, left)?;
                if left.truthy() { self.eval(frame, right)? } else { left }
            }
            Expr::Or(left, right) => {
                let left = self.eval(frame, left)?;
                if left.truthy() { left } else { self.eval(frame, right)? }
            }
            Expr::IfExp { cond, body, orelse } => {
                if self.eval(frame, cond)?.truthy() {
                    self.eval(frame, body)?
                } else {
                    self.eval(frame, orelse)?
                }
            }
            Expr::Call(callee, args) => {
                let callee = self.eval(frame, callee)?;
                let args = self.eval_all(frame, args)?;
                self.call(frame, &callee, args)?
            }
            Expr::Method(receiver, name, args) => {
                let receiver = self.eval(frame, receiver)?;
                let args = self.eval_all(frame, args)?;
                builtins::call_method(&receiver, name, args)?
            }
            Expr::Subscript(object, index) => {
                let object = self.eval(frame, object)?;
                let index = self.eval(frame, index)?;
                ops::get_item(&object, &index)?
            }
            Expr::Slice { object, lower, upper } => {
                let object = self.eval(frame, object)?;
                let lower = self.eval_int(frame, lower.as_deref())?;
                let upper = self.eval_int(frame, upper.as_deref())?;
                ops::slice(&object, lower, upper)?
            }
        };
        Ok(value)
    }

    fn fstring(&mut self, frame: &Frame<'_>, parts: &[FStringPart]) -> Exec<String>
    {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Field { expr, repr, spec } => {
                    let value = self.eval(frame, expr)?;
                    let text = if *repr { builtins::repr(&value)? } else { builtins::to_str(&value)? };
                    let text = match spec {
                        Some(spec) if *repr => ops::format_spec(&Value::str(&text), text.clone(), spec)?,
                        Some(spec) => ops::format_spec(&value, text, spec)?,
                        None => text,
                    };
                    out.push_str(&text);
                }
            }
        }
        Ok(out)
    }

    fn call(&mut self, frame: &Frame<'_>, callee: &Value, args: Vec<Value>) -> Exec<Value>
    {
        match callee {
            Value::Function(function) => self.call_function(frame, function, args),
            Value::Builtin(builtin) => Ok(builtins::call_builtin(*builtin, args, &mut *self.output)?),
            other => Err(ExceptionValue::type_error(format!("'{}' object is not callable", other.type_name())).into()),
        }
    }

    fn bind_arguments(function: &Function, args: Vec<Value>, frame: &Frame<'_>) -> Exec<()>
    {
        let def = &function.def;
        let total = def.params.len();
        let required = total - function.defaults.len();

        if args.len() > total {
            return Err(ExceptionValue::type_error(format!(
                "{}() takes {total} positional argument{} but {} {} given",
                def.name,
                if total == 1 { "" } else { "s" },
                args.len(),
                if args.len() == 1 { "was" } else { "were" }
            ))
            .into());
        }
        if args.len() < required {
            let missing: Vec<String> = def.params[args.len()..required]
                .iter()
                .map(|param| format!("'{}'", param.name))
                .collect();
            let listed = match missing.as_slice() {
                [one] => one.clone(),
                [init @ .., last] => format!("{} and {last}", init.join(", ")),
                [] => String::new(),
            };
            return Err(ExceptionValue::type_error(format!(
                "{}() missing {} required positional argument{}: {listed}",
                def.name,
                missing.len(),
                if missing.len() == 1 { "" } else { "s" }
            ))
            .into());
        }

        let mut args = args.into_iter();
        for (i, param) in def.params.iter().enumerate() {
            let value = match args.next() {
                Some(value) => value,
                None => function.defaults.get(i - required).cloned().unwrap_or(Value::None),
            };
            frame.set(&param.name, value);
        }
        Ok(())
    }

    fn call_function(&mut self, caller: &Frame<'_>, function: &Rc<Function>, args: Vec<Value>) -> Exec<Value>
    {
        if caller.depth() + 1 > MAX_CALL_DEPTH {
            return Err(ExceptionValue::new(ExceptionKind::RecursionError, "maximum recursion depth exceeded").into());
        }

        let def = &function.def;
        let frame = Frame::call(caller, &def.name, def.line);
        Self::bind_arguments(function, args, &frame)?;

        match self.exec_block(&frame, &def.body) {
            Ok(()) | Err(Unwind::Break | Unwind::Continue) => Ok(Value::None),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Terminated) => Err(Unwind::Terminated),
            Err(Unwind::Raise(exception)) => {
                debug!(function = %def.name, %exception, "Exception leaving frame");
                match self.hook.on_exception(&frame, &exception.display_text()) {
                    Flow::Proceed => Err(Unwind::Raise(exception)),
                    Flow::Terminate => Err(Unwind::Terminated),
                }
            }
        }
    }
}
