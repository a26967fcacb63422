//! # Execution Hook Adapter
//!
//! The seam between a language runtime and the debugger.
//!
//! A runtime calls [`TraceHook::on_line`] before every statement and
//! [`TraceHook::on_exception`] whenever an exception is about to leave a
//! frame. The hook answers with a [`Flow`]: keep going, or abort the target.
//!
//! [`HookAdapter`] is the debugger's implementation. It keeps the current
//! [`ResumeMode`] and only blocks in the [`Debugger`] when the mode says the
//! statement should pause. Statements that run through still check for a
//! pending `Quit`. Exceptions always pause.

use crate::command::ResumeMode;
use crate::debugger::Debugger;
use crate::handle::ExecutionHandle;

/// What the runtime must do once a hook callback returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow
{
    /// Execute the statement (or keep unwinding the exception).
    Proceed,
    /// Abort the target with the runtime's unrecoverable terminate signal.
    Terminate,
}

/// Callbacks a runtime invokes while executing a target
pub trait TraceHook
{
    /// Called before the statement at `handle` executes.
    fn on_line(&mut self, handle: &dyn ExecutionHandle) -> Flow;

    /// Called when an exception is about to propagate out of `handle`.
    fn on_exception(&mut self, handle: &dyn ExecutionHandle, error: &str) -> Flow;
}

/// Hook that never pauses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl TraceHook for NoopHook
{
    fn on_line(&mut self, _handle: &dyn ExecutionHandle) -> Flow
    {
        Flow::Proceed
    }

    fn on_exception(&mut self, _handle: &dyn ExecutionHandle, _error: &str) -> Flow
    {
        Flow::Proceed
    }
}

/// Debugger-backed hook carrying the current resume directive
#[derive(Debug)]
pub struct HookAdapter
{
    debugger: Debugger,
    mode: ResumeMode,
}

impl HookAdapter
{
    /// Wrap a controller. The first statement always pauses.
    #[must_use]
    pub const fn new(debugger: Debugger) -> Self
    {
        Self {
            debugger,
            mode: ResumeMode::SingleStep,
        }
    }

    /// Directive currently in effect.
    #[must_use]
    pub const fn mode(&self) -> ResumeMode
    {
        self.mode
    }

    /// Borrow the controller.
    #[must_use]
    pub const fn debugger(&self) -> &Debugger
    {
        &self.debugger
    }

    /// Give the controller back once the target has stopped running.
    #[must_use]
    pub fn into_debugger(self) -> Debugger
    {
        self.debugger
    }

    fn pause(&mut self, handle: &dyn ExecutionHandle, exception: Option<&str>) -> Flow
    {
        self.mode = self.debugger.pause(handle, exception);
        if self.mode.is_terminate() {
            Flow::Terminate
        } else {
            Flow::Proceed
        }
    }
}

impl TraceHook for HookAdapter
{
    fn on_line(&mut self, handle: &dyn ExecutionHandle) -> Flow
    {
        if self.mode.is_terminate() {
            return Flow::Terminate;
        }
        if !self.mode.breaks_at_line(handle.depth()) {
            if self.debugger.quit_requested() {
                self.mode = ResumeMode::Terminate;
                return Flow::Terminate;
            }
            return Flow::Proceed;
        }
        self.pause(handle, None)
    }

    fn on_exception(&mut self, handle: &dyn ExecutionHandle, error: &str) -> Flow
    {
        if self.mode.is_terminate() {
            return Flow::Terminate;
        }
        self.pause(handle, Some(error))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::channel::channel_pair;
    use crate::command::Command;
    use crate::handle::Displayable;
    use crate::snapshot::SnapshotLimits;

    struct Frame;

    impl ExecutionHandle for Frame
    {
        fn file(&self) -> &str
        {
            "loop.py"
        }

        fn line(&self) -> u32
        {
            2
        }

        fn function_name(&self) -> &str
        {
            "<module>"
        }

        fn visit_bindings(&self, _visitor: &mut dyn FnMut(&str, &dyn Displayable)) {}

        fn parent(&self) -> Option<&dyn ExecutionHandle>
        {
            None
        }
    }

    #[test]
    fn test_quit_stops_a_continued_target()
    {
        let (execution, observer) = channel_pair();
        let mut hook = HookAdapter::new(Debugger::new(execution, SnapshotLimits::default()));
        observer.send(Command::Continue).unwrap();

        assert_eq!(hook.on_line(&Frame), Flow::Proceed);
        assert_eq!(hook.mode(), ResumeMode::Continue);
        assert_eq!(hook.on_line(&Frame), Flow::Proceed);

        observer.send(Command::Quit).unwrap();
        assert_eq!(hook.on_line(&Frame), Flow::Terminate);
        assert!(hook.mode().is_terminate());
        assert_eq!(hook.on_line(&Frame), Flow::Terminate);
        assert_eq!(hook.debugger().pauses(), 1);
    }

    #[test]
    fn test_dropped_observer_stops_a_continued_target()
    {
        let (execution, observer) = channel_pair();
        let mut hook = HookAdapter::new(Debugger::new(execution, SnapshotLimits::default()));
        observer.send(Command::Continue).unwrap();
        assert_eq!(hook.on_line(&Frame), Flow::Proceed);

        drop(observer);
        assert_eq!(hook.on_line(&Frame), Flow::Terminate);
    }
}
