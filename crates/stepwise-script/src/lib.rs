//! # stepwise-script
//!
//! A small dynamically typed scripting language whose interpreter reports
//! every statement to a [`stepwise_core::TraceHook`].
//!
//! The language covers the subset of Python that the debugger's scenarios
//! need: functions with defaults, `if`/`while`/`for`, `try`/`except`/`raise`,
//! lists, tuples, dicts, f-strings and a handful of builtins. Its frames
//! implement [`stepwise_core::ExecutionHandle`], so the debugger can inspect
//! them while the script is paused.
//!
//! ```no_run
//! use stepwise_core::{SessionConfig, spawn_session};
//! use stepwise_script::ScriptTarget;
//!
//! let session = spawn_session(SessionConfig::default(), || {
//!     ScriptTarget::load("app.py", Box::new(std::io::stdout()))
//! })?;
//! # Ok::<(), stepwise_core::DebuggerError>(())
//! ```

pub mod ast;
pub mod builtins;
pub mod error;
pub mod frame;
pub mod interpreter;
pub mod lexer;
pub mod loader;
pub mod ops;
pub mod parser;
pub mod value;

pub use error::{Result, ScriptError};
pub use frame::Frame;
pub use interpreter::{Interpreter, MAX_CALL_DEPTH};
pub use loader::ScriptTarget;
pub use parser::parse;
pub use value::{ExceptionKind, ExceptionValue, Value};
