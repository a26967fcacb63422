//! Tests for the session runner and the pause/resume protocol

use std::sync::{Arc, Mutex};
use std::thread;

use stepwise_core::prelude::*;
use stepwise_core::session::EXECUTION_THREAD_NAME;
use stepwise_core::{Exit, RenderError};

struct FakeFrame
{
    function: &'static str,
    line: u32,
    parent: Option<Box<FakeFrame>>,
}

impl ExecutionHandle for FakeFrame
{
    fn file(&self) -> &str
    {
        "/tmp/work/fake.py"
    }

    fn line(&self) -> u32
    {
        self.line
    }

    fn function_name(&self) -> &str
    {
        self.function
    }

    fn visit_bindings(&self, visitor: &mut dyn FnMut(&str, &dyn Displayable))
    {
        visitor("__name__", &"'__main__'".to_string());
        visitor("line", &self.line.to_string());
    }

    fn parent(&self) -> Option<&dyn ExecutionHandle>
    {
        self.parent.as_deref().map(|frame| frame as &dyn ExecutionHandle)
    }
}

/// Stack listed outermost first.
fn frame(stack: &[(&'static str, u32)]) -> FakeFrame
{
    let mut current: Option<Box<FakeFrame>> = None;
    for (function, line) in stack {
        current = Some(Box::new(FakeFrame {
            function: *function,
            line: *line,
            parent: current,
        }));
    }
    *current.expect("stack must not be empty")
}

enum Event
{
    Line(Vec<(&'static str, u32)>),
    Raise(Vec<(&'static str, u32)>, &'static str),
    Escape(&'static str),
    Panic,
}

struct FakeProgram
{
    events: Vec<Event>,
}

impl Debuggee for FakeProgram
{
    fn run(self, hook: &mut dyn TraceHook) -> std::result::Result<(), TargetFailure>
    {
        for event in self.events {
            let flow = match event {
                Event::Line(stack) => hook.on_line(&frame(&stack)),
                Event::Raise(stack, text) => hook.on_exception(&frame(&stack), text),
                Event::Escape(text) => return Err(TargetFailure::Raised(text.to_string())),
                Event::Panic => panic!("runtime invariant broken"),
            };
            if flow == Flow::Terminate {
                return Err(TargetFailure::Terminated);
            }
        }
        Ok(())
    }
}

fn start(events: Vec<Event>) -> Session
{
    spawn_session(SessionConfig::default(), move || {
        Ok::<_, String>(FakeProgram { events })
    })
    .unwrap()
}

/// Answer every pause with the next scripted command (then `Continue`).
fn drive(session: &Session, commands: &[Command]) -> Vec<Snapshot>
{
    let mut commands = commands.iter().copied();
    let mut seen = Vec::new();
    while let Some(snapshot) = session.next_snapshot() {
        let pause = snapshot.is_pause();
        seen.push(snapshot);
        if pause {
            let command = commands.next().unwrap_or(Command::Continue);
            // The target may already be gone after a Quit.
            let _ = session.send(command);
        }
    }
    seen
}

fn lines(snapshots: &[Snapshot]) -> Vec<u32>
{
    snapshots
        .iter()
        .filter_map(|snapshot| snapshot.location().map(|location| location.line))
        .collect()
}

fn sample_program() -> Vec<Event>
{
    vec![
        Event::Line(vec![("<module>", 1)]),
        Event::Line(vec![("<module>", 4)]),
        Event::Line(vec![("<module>", 4), ("greet", 2)]),
        Event::Line(vec![("<module>", 4), ("greet", 3)]),
        Event::Line(vec![("<module>", 5)]),
    ]
}

#[test]
fn test_step_into_pauses_on_every_line()
{
    let session = start(sample_program());
    let seen = drive(&session, &[Command::StepInto; 5]);

    assert_eq!(lines(&seen), vec![1, 4, 2, 3, 5]);
    assert_eq!(seen[2].function(), Some("greet"));
    assert_eq!(seen[2].depth(), 1);
    assert_eq!(seen[2].stack()[0].file, "fake.py");
    assert_eq!(seen[2].stack()[1].function, "<module>");
    assert_eq!(session.join(), Exit::Completed);
}

#[test]
fn test_one_snapshot_per_command()
{
    let session = start(sample_program());

    let first = session.next_snapshot().unwrap();
    assert_eq!(first.location().unwrap().line, 1);
    assert!(session.drain_latest().latest.is_none());

    session.send(Command::StepInto).unwrap();
    let second = session.next_snapshot().unwrap();
    assert_eq!(second.location().unwrap().line, 4);
    assert!(session.drain_latest().latest.is_none());

    session.send(Command::Continue).unwrap();
    assert!(session.next_snapshot().is_none());
    assert_eq!(session.join(), Exit::Completed);
}

#[test]
fn test_step_over_skips_deeper_frames()
{
    let session = start(sample_program());
    let seen = drive(&session, &[Command::StepOver; 5]);

    assert_eq!(lines(&seen), vec![1, 4, 5]);
    assert!(seen.iter().all(|snapshot| snapshot.depth() == 0));
}

#[test]
fn test_step_over_inside_callee_stops_at_caller()
{
    let session = start(vec![
        Event::Line(vec![("<module>", 4), ("greet", 2)]),
        Event::Line(vec![("<module>", 4), ("greet", 2), ("shout", 7)]),
        Event::Line(vec![("<module>", 4), ("greet", 3)]),
        Event::Line(vec![("<module>", 5)]),
    ]);
    let seen = drive(&session, &[Command::StepOver, Command::StepOver, Command::StepOver]);

    assert_eq!(lines(&seen), vec![2, 3, 5]);
}

#[test]
fn test_continue_still_pauses_on_exceptions()
{
    let session = start(vec![
        Event::Line(vec![("<module>", 1)]),
        Event::Line(vec![("<module>", 2)]),
        Event::Raise(vec![("<module>", 3), ("f", 9)], "ValueError: bad"),
        Event::Line(vec![("<module>", 6)]),
    ]);
    let seen = drive(&session, &[Command::Continue, Command::Continue]);

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].exception(), Some("ValueError: bad"));
    assert_eq!(seen[1].location().unwrap().line, 9);
    assert_eq!(session.join(), Exit::Completed);
}

#[test]
fn test_quit_ends_without_further_snapshots()
{
    let session = start(sample_program());
    let seen = drive(&session, &[Command::StepInto, Command::Quit]);

    assert_eq!(lines(&seen), vec![1, 4]);
    assert_eq!(session.join(), Exit::Terminated);
}

#[test]
fn test_escaped_exception_yields_terminal_snapshot()
{
    let session = start(vec![Event::Line(vec![("<module>", 1)]), Event::Escape("boom")]);
    let seen = drive(&session, &[Command::Continue]);

    let last = seen.last().unwrap();
    assert!(!last.is_pause());
    assert_eq!(last.exception(), Some("boom"));
    assert!(last.location().is_none());
    assert!(last.locals().is_empty());
    assert!(last.stack().is_empty());
    assert_eq!(session.join(), Exit::Failed("boom".to_string()));
}

#[test]
fn test_loader_failure_is_reported_as_terminal_snapshot()
{
    let session = spawn_session(SessionConfig::default(), || {
        Err::<FakeProgram, _>("missing.py not found".to_string())
    })
    .unwrap();

    let snapshot = session.next_snapshot().unwrap();
    assert_eq!(snapshot.exception(), Some("missing.py not found"));
    assert!(session.next_snapshot().is_none());
    assert!(matches!(session.join(), Exit::Failed(_)));
}

#[test]
fn test_runtime_panic_is_contained()
{
    let session = start(vec![Event::Line(vec![("<module>", 1)]), Event::Panic]);
    let seen = drive(&session, &[Command::Continue]);

    let last = seen.last().unwrap();
    assert!(last.exception().unwrap().contains("internal error"));
    assert!(matches!(session.join(), Exit::Failed(_)));
}

#[test]
fn test_dunder_bindings_are_hidden()
{
    let session = start(sample_program());
    let first = session.next_snapshot().unwrap();

    assert!(first.locals().contains_key("line"));
    assert!(!first.locals().keys().any(|name| name.starts_with("__")));
    assert_eq!(session.join(), Exit::Terminated);
}

#[test]
fn test_target_runs_on_named_thread()
{
    let name = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&name);
    let session = spawn_session(SessionConfig::default(), move || {
        *captured.lock().unwrap() = thread::current().name().map(str::to_string);
        Ok::<_, RenderError>(FakeProgram { events: Vec::new() })
    })
    .unwrap();

    assert!(session.next_snapshot().is_none());
    assert_eq!(session.join(), Exit::Completed);
    assert_eq!(name.lock().unwrap().as_deref(), Some(EXECUTION_THREAD_NAME));
}
