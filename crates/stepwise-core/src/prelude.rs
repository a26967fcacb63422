//! Common module for library exports

pub use crate::command::{Command, ResumeMode};
pub use crate::error::{DebuggerError, RenderError, Result};
pub use crate::handle::{Displayable, ExecutionHandle};
pub use crate::hook::{Flow, TraceHook};
pub use crate::session::{Debuggee, Session, SessionConfig, TargetFailure, spawn_session};
pub use crate::snapshot::{Location, Snapshot, SnapshotLimits, StackEntry};
