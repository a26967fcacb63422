//! # Debugger Control State Machine
//!
//! Owns the pause/resume protocol on the execution side of the channel pair.
//!
//! ## States
//!
//! ```text
//!            hook fires               StepInto / StepOver / Continue
//! Running ─────────────────▶ Paused ───────────────────────────────▶ Running
//!    │                          │
//!    │ target returns / raises  │ Quit
//!    │ Quit / observer gone     │
//!    ▼                          ▼
//! Terminated ◀──────────────────┘
//! ```
//!
//! `Terminated` is final. A pause always publishes exactly one snapshot and
//! consumes exactly one command before it returns. While running, the
//! runtime polls for a `Quit` at every statement boundary without blocking.
//!
//! ## No hidden frame state
//!
//! The paused frame is passed into [`Debugger::pause`] and is only borrowed
//! for the duration of the call. Nothing about the target is stored between
//! pauses except the pause counter.

use tracing::{debug, info, warn};

use crate::channel::ExecutionEndpoint;
use crate::command::{Command, ResumeMode};
use crate::handle::ExecutionHandle;
use crate::snapshot::{Snapshot, SnapshotBuilder, SnapshotLimits};

/// Lifecycle state of a debugging session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerState
{
    /// Target executing between hook callbacks.
    Running,
    /// Hook fired, snapshot published, waiting for a command.
    Paused,
    /// Terminate issued, target exited, or an exception escaped the top level.
    Terminated,
}

/// How the execution context came to an end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit
{
    /// The target's top-level code returned normally.
    Completed,
    /// The operator quit (or the observer went away).
    Terminated,
    /// The target failed to load, or an exception escaped the top-level frame.
    Failed(String),
}

/// Execution-side controller
///
/// Blocks the execution context at each pause and turns the operator's
/// answer into a [`ResumeMode`].
#[derive(Debug)]
pub struct Debugger
{
    state: DebuggerState,
    builder: SnapshotBuilder,
    endpoint: ExecutionEndpoint,
    pauses: u64,
}

impl Debugger
{
    /// Create a controller in the `Running` state.
    #[must_use]
    pub fn new(endpoint: ExecutionEndpoint, limits: SnapshotLimits) -> Self
    {
        Self {
            state: DebuggerState::Running,
            builder: SnapshotBuilder::new(limits),
            endpoint,
            pauses: 0,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DebuggerState
    {
        self.state
    }

    /// Number of completed pause/command exchanges.
    #[must_use]
    pub const fn pauses(&self) -> u64
    {
        self.pauses
    }

    /// Pause at `handle`: publish a snapshot and block for one command.
    ///
    /// Returns the directive the runtime must carry out. A lost observer is
    /// treated like `Quit`, since nobody is left to resume the target.
    pub fn pause(&mut self, handle: &dyn ExecutionHandle, exception: Option<&str>) -> ResumeMode
    {
        if self.state == DebuggerState::Terminated {
            return ResumeMode::Terminate;
        }

        let depth = handle.depth();
        let snapshot = self.builder.build(handle, exception);
        debug!(
            file = handle.file(),
            line = handle.line(),
            function = handle.function_name(),
            depth,
            exception = exception.is_some(),
            "Paused"
        );

        self.state = DebuggerState::Paused;
        if let Err(err) = self.endpoint.publish(snapshot) {
            warn!("Cannot publish snapshot: {err}");
            self.state = DebuggerState::Terminated;
            return ResumeMode::Terminate;
        }

        let command = match self.endpoint.await_command() {
            Ok(command) => command,
            Err(err) => {
                warn!("Cannot receive command: {err}");
                self.state = DebuggerState::Terminated;
                return ResumeMode::Terminate;
            }
        };
        self.pauses += 1;
        debug!(%command, "Resuming");

        self.state = if command == Command::Quit {
            DebuggerState::Terminated
        } else {
            DebuggerState::Running
        };
        command.directive(depth)
    }

    /// Check, without blocking, whether the target should stop running.
    ///
    /// True once a `Quit` has arrived or the observer has gone away. Any
    /// other command received while running answers no pause and is dropped.
    pub fn quit_requested(&mut self) -> bool
    {
        if self.state == DebuggerState::Terminated {
            return true;
        }

        match self.endpoint.poll_command() {
            Ok(None) => false,
            Ok(Some(Command::Quit)) => {
                info!("Quit while running");
                self.state = DebuggerState::Terminated;
                true
            }
            Ok(Some(command)) => {
                debug!(%command, "Dropping command received while running");
                false
            }
            Err(err) => {
                warn!("Observer gone while running: {err}");
                self.state = DebuggerState::Terminated;
                true
            }
        }
    }

    /// Record the end of the target's execution.
    ///
    /// A failure is reported to the observer as a terminal snapshot carrying
    /// only the failure text. Completion and operator termination are silent.
    pub fn finish(&mut self, exit: &Exit)
    {
        if let Exit::Failed(text) = exit {
            if let Err(err) = self.endpoint.publish(Snapshot::terminal(text.as_str())) {
                warn!("Cannot publish final snapshot: {err}");
            }
        }
        self.state = DebuggerState::Terminated;
        info!(pauses = self.pauses, ?exit, "Target finished");
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::channel::channel_pair;
    use crate::handle::Displayable;

    struct Frame;

    impl ExecutionHandle for Frame
    {
        fn file(&self) -> &str
        {
            "demo.py"
        }

        fn line(&self) -> u32
        {
            5
        }

        fn function_name(&self) -> &str
        {
            "<module>"
        }

        fn visit_bindings(&self, visitor: &mut dyn FnMut(&str, &dyn Displayable))
        {
            visitor("x", &"1".to_string());
        }

        fn parent(&self) -> Option<&dyn ExecutionHandle>
        {
            None
        }
    }

    #[test]
    fn test_pause_publishes_snapshot_and_returns_directive()
    {
        let (execution, observer) = channel_pair();
        let mut debugger = Debugger::new(execution, SnapshotLimits::default());
        observer.send(Command::StepOver).unwrap();

        let directive = debugger.pause(&Frame, None);

        assert_eq!(directive, ResumeMode::StepOver { depth: 0 });
        assert_eq!(debugger.state(), DebuggerState::Running);
        assert_eq!(debugger.pauses(), 1);
        let snapshot = observer.drain_latest().latest.unwrap();
        assert_eq!(snapshot.locals()["x"], "1");
    }

    #[test]
    fn test_quit_terminates_silently()
    {
        let (execution, observer) = channel_pair();
        let mut debugger = Debugger::new(execution, SnapshotLimits::default());
        observer.send(Command::Quit).unwrap();

        assert!(debugger.pause(&Frame, None).is_terminate());
        assert_eq!(debugger.state(), DebuggerState::Terminated);

        debugger.finish(&Exit::Terminated);
        let drain = observer.drain_latest();
        assert_eq!(drain.drained, 1);
    }

    #[test]
    fn test_terminated_state_is_final()
    {
        let (execution, observer) = channel_pair();
        let mut debugger = Debugger::new(execution, SnapshotLimits::default());
        observer.send(Command::Quit).unwrap();
        debugger.pause(&Frame, None);
        let _ = observer.drain_latest();

        observer.send(Command::StepInto).unwrap();
        assert!(debugger.pause(&Frame, None).is_terminate());
        assert!(observer.drain_latest().latest.is_none());
    }

    #[test]
    fn test_lost_observer_terminates()
    {
        let (execution, observer) = channel_pair();
        let mut debugger = Debugger::new(execution, SnapshotLimits::default());
        drop(observer);

        assert!(debugger.pause(&Frame, None).is_terminate());
        assert_eq!(debugger.state(), DebuggerState::Terminated);
    }

    #[test]
    fn test_quit_requested_while_running()
    {
        let (execution, observer) = channel_pair();
        let mut debugger = Debugger::new(execution, SnapshotLimits::default());
        assert!(!debugger.quit_requested());

        observer.send(Command::StepInto).unwrap();
        assert!(!debugger.quit_requested());
        assert_eq!(debugger.state(), DebuggerState::Running);

        observer.send(Command::Quit).unwrap();
        assert!(debugger.quit_requested());
        assert_eq!(debugger.state(), DebuggerState::Terminated);
        assert!(observer.drain_latest().latest.is_none());
    }

    #[test]
    fn test_lost_observer_stops_running_target()
    {
        let (execution, observer) = channel_pair();
        let mut debugger = Debugger::new(execution, SnapshotLimits::default());
        drop(observer);

        assert!(debugger.quit_requested());
        assert_eq!(debugger.state(), DebuggerState::Terminated);
    }

    #[test]
    fn test_failure_publishes_terminal_snapshot()
    {
        let (execution, observer) = channel_pair();
        let mut debugger = Debugger::new(execution, SnapshotLimits::default());

        debugger.finish(&Exit::Failed("boom".to_string()));

        let snapshot = observer.drain_latest().latest.unwrap();
        assert_eq!(snapshot.exception(), Some("boom"));
        assert!(snapshot.stack().is_empty());
        assert_eq!(debugger.state(), DebuggerState::Terminated);
    }
}
