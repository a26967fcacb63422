//! # Session Runner
//!
//! Starts the execution context on its own named thread and hands the
//! observer endpoint back to the caller.
//!
//! The target is produced by a loader closure that runs *on* the execution
//! thread, so a target never has to be `Send`. Whatever happens to the target
//! (load error, normal completion, operator quit, uncaught exception, even a
//! runtime panic) ends with the execution endpoint being dropped, which the
//! observer sees as a disconnected snapshot queue.

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::channel::{Drain, ObserverEndpoint, channel_pair};
use crate::command::Command;
use crate::debugger::{Debugger, Exit};
use crate::error::{DebuggerError, Result};
use crate::hook::{HookAdapter, TraceHook};
use crate::snapshot::{Snapshot, SnapshotLimits};

/// Name of the dedicated execution thread.
pub const EXECUTION_THREAD_NAME: &str = "stepwise-exec";

/// Stack reserved for the execution thread. Interpreted targets recurse on it.
pub const EXECUTION_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Why a target stopped before its top-level code returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetFailure
{
    /// The hook asked for termination and the runtime honoured it.
    Terminated,
    /// An exception escaped the top-level frame. Carries its display text.
    Raised(String),
}

/// A program that can be run under a [`TraceHook`]
pub trait Debuggee
{
    /// Run the program to completion, reporting every statement and every
    /// propagating exception to `hook`.
    ///
    /// # Errors
    ///
    /// Returns a [`TargetFailure`] if the program was terminated or an
    /// exception escaped the top-level frame.
    fn run(self, hook: &mut dyn TraceHook) -> std::result::Result<(), TargetFailure>;
}

/// Settings for one debugging session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig
{
    /// Bounds applied to every snapshot.
    pub limits: SnapshotLimits,
}

/// A running (or finished) debugging session, seen from the observer side.
#[derive(Debug)]
pub struct Session
{
    observer: ObserverEndpoint,
    thread: JoinHandle<Exit>,
}

/// Start a session.
///
/// `loader` is called on the execution thread. If it fails, its error text is
/// delivered as the one and only (terminal) snapshot.
///
/// # Errors
///
/// Returns [`DebuggerError::SpawnFailed`] if the execution thread could not
/// be started.
pub fn spawn_session<D, E, L>(config: SessionConfig, loader: L) -> Result<Session>
where
    D: Debuggee,
    E: Display,
    L: FnOnce() -> std::result::Result<D, E> + Send + 'static,
{
    let (execution, observer) = channel_pair();

    let thread = thread::Builder::new()
        .name(EXECUTION_THREAD_NAME.to_string())
        .stack_size(EXECUTION_STACK_SIZE)
        .spawn(move || {
            let mut debugger = Debugger::new(execution, config.limits);
            let target = match loader() {
                Ok(target) => target,
                Err(err) => {
                    let exit = Exit::Failed(err.to_string());
                    error!("Failed to load target: {err}");
                    debugger.finish(&exit);
                    return exit;
                }
            };

            let mut hook = HookAdapter::new(debugger);
            let result = panic::catch_unwind(AssertUnwindSafe(|| target.run(&mut hook)));
            let mut debugger = hook.into_debugger();

            let exit = match result {
                Ok(Ok(())) => Exit::Completed,
                Ok(Err(TargetFailure::Terminated)) => Exit::Terminated,
                Ok(Err(TargetFailure::Raised(text))) => Exit::Failed(text),
                Err(payload) => {
                    let text = panic_message(payload.as_ref());
                    error!("Target runtime panicked: {text}");
                    Exit::Failed(format!("internal error: {text}"))
                }
            };
            debugger.finish(&exit);
            exit
        })
        .map_err(DebuggerError::SpawnFailed)?;

    info!(thread = EXECUTION_THREAD_NAME, "Session started");
    Ok(Session { observer, thread })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String
{
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Session
{
    /// The observer endpoint.
    #[must_use]
    pub const fn observer(&self) -> &ObserverEndpoint
    {
        &self.observer
    }

    /// Answer the current pause.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::ExecutionDisconnected`] once the target has
    /// finished.
    pub fn send(&self, command: Command) -> Result<()>
    {
        self.observer.send(command)
    }

    /// Take every queued snapshot, keeping only the latest.
    #[must_use]
    pub fn drain_latest(&self) -> Drain
    {
        self.observer.drain_latest()
    }

    /// Block for the next snapshot; `None` once the target has finished.
    #[must_use]
    pub fn next_snapshot(&self) -> Option<Snapshot>
    {
        self.observer.next_snapshot()
    }

    /// Wait up to `timeout` for the next snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::ExecutionDisconnected`] once the target has
    /// finished and nothing is left in the queue.
    pub fn next_snapshot_timeout(&self, timeout: Duration) -> Result<Option<Snapshot>>
    {
        self.observer.next_snapshot_timeout(timeout)
    }

    /// Whether the execution thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool
    {
        self.thread.is_finished()
    }

    /// Wait for the execution thread and report how the target ended.
    ///
    /// The observer endpoint is dropped first, so a target still waiting at a
    /// pause is terminated there, and a target running without pauses (after
    /// `Continue`) is terminated at its next statement boundary.
    #[must_use]
    pub fn join(self) -> Exit
    {
        let Self { observer, thread } = self;
        drop(observer);
        thread
            .join()
            .unwrap_or_else(|_| Exit::Failed("execution thread panicked".to_string()))
    }
}
