//! Live call frames.
//!
//! A frame borrows its caller, so the call stack is a chain of references
//! that lives on the interpreter's native stack. The debugger sees each frame
//! through [`ExecutionHandle`] and never outlives the hook callback.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use stepwise_core::{Displayable, ExecutionHandle};

use crate::value::Value;

pub const MODULE_FUNCTION: &str = "<module>";

#[derive(Debug)]
pub struct Frame<'p>
{
    file: Rc<str>,
    function: String,
    line: Cell<u32>,
    locals: RefCell<IndexMap<String, Value>>,
    parent: Option<&'p Frame<'p>>,
    depth: usize,
}

impl<'p> Frame<'p>
{
    /// The top-level frame. Its locals are the module globals.
    #[must_use]
    pub fn module(file: Rc<str>) -> Self
    {
        Self {
            file,
            function: MODULE_FUNCTION.to_string(),
            line: Cell::new(1),
            locals: RefCell::new(IndexMap::new()),
            parent: None,
            depth: 0,
        }
    }

    /// A frame for a call made from `caller`.
    #[must_use]
    pub fn call(caller: &'p Frame<'p>, function: &str, line: u32) -> Self
    {
        Self {
            file: Rc::clone(&caller.file),
            function: function.to_string(),
            line: Cell::new(line),
            locals: RefCell::new(IndexMap::new()),
            parent: Some(caller),
            depth: caller.depth + 1,
        }
    }

    pub fn set_line(&self, line: u32)
    {
        self.line.set(line);
    }

    #[must_use]
    pub const fn depth(&self) -> usize
    {
        self.depth
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value>
    {
        self.locals.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value)
    {
        self.locals.borrow_mut().insert(name.to_string(), value);
    }

    pub fn remove(&self, name: &str)
    {
        self.locals.borrow_mut().shift_remove(name);
    }

    /// The module frame at the root of the chain.
    #[must_use]
    pub fn globals(&self) -> &Frame<'p>
    {
        let mut frame = self;
        while let Some(parent) = frame.parent {
            frame = parent;
        }
        frame
    }
}

impl ExecutionHandle for Frame<'_>
{
    fn file(&self) -> &str
    {
        &self.file
    }

    fn line(&self) -> u32
    {
        self.line.get()
    }

    fn function_name(&self) -> &str
    {
        &self.function
    }

    fn visit_bindings(&self, visitor: &mut dyn FnMut(&str, &dyn Displayable))
    {
        let Ok(locals) = self.locals.try_borrow() else {
            return;
        };
        for (name, value) in locals.iter() {
            visitor(name.as_str(), value as &dyn Displayable);
        }
    }

    fn parent(&self) -> Option<&dyn ExecutionHandle>
    {
        self.parent.map(|frame| frame as &dyn ExecutionHandle)
    }

    fn depth(&self) -> usize
    {
        self.depth
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_call_chain()
    {
        let module = Frame::module(Rc::from("/src/app.py"));
        module.set("x", Value::Int(1));
        let call = Frame::call(&module, "greet", 5);
        call.set("name", Value::str("Alice"));

        assert_eq!(ExecutionHandle::depth(&call), 1);
        assert_eq!(call.parent().unwrap().function_name(), MODULE_FUNCTION);
        assert!(call.get("x").is_none());
        assert!(call.globals().get("x").is_some());
        assert_eq!(call.file(), "/src/app.py");
    }

    #[test]
    fn test_bindings_in_insertion_order()
    {
        let frame = Frame::module(Rc::from("a.py"));
        frame.set("b", Value::Int(1));
        frame.set("a", Value::Int(2));
        frame.set("b", Value::Int(3));

        let mut names = Vec::new();
        frame.visit_bindings(&mut |name: &str, _value: &dyn Displayable| names.push(name.to_string()));
        assert_eq!(names, vec!["b", "a"]);
    }
}
