//! # stepwise-core
//!
//! Runtime-independent debugger control engine for Stepwise.
//!
//! This crate provides:
//! - The [`ExecutionHandle`] abstraction a language runtime implements for
//!   its live frames
//! - Snapshot construction (previews, dunder filtering, stack walks)
//! - The command/state channel pair between execution and observer
//! - The pause/resume state machine and the [`TraceHook`] seam
//! - A session runner that owns the dedicated execution thread
//!
//! ## Two contexts
//!
//! The target runs on its own thread and blocks at every pause. The observer
//! (TUI or headless console) never touches a frame: all it ever sees are
//! immutable [`Snapshot`]s, and all it ever does is send [`Command`]s back.

pub mod channel;
pub mod command;
pub mod debugger;
pub mod error;
pub mod handle;
pub mod hook;
pub mod prelude;
pub mod session;
pub mod snapshot;

pub use channel::{Drain, ExecutionEndpoint, ObserverEndpoint, channel_pair};
pub use command::{Command, ResumeMode};
pub use debugger::{Debugger, DebuggerState, Exit};
pub use error::{DebuggerError, RenderError, Result};
pub use handle::{Displayable, ExecutionHandle};
pub use hook::{Flow, HookAdapter, NoopHook, TraceHook};
pub use session::{Debuggee, Session, SessionConfig, TargetFailure, spawn_session};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotLimits};
