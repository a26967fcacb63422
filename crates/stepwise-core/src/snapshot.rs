//! # Snapshots
//!
//! Immutable records of paused program state, and the builder that produces
//! them from an [`ExecutionHandle`].
//!
//! A snapshot is the only thing the observer ever sees of the target. It is
//! plain owned data (strings and integers), so it can cross threads freely and
//! outlive the frame it was built from.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::handle::{Displayable, ExecutionHandle};

/// Preview substituted for any value whose rendering fails.
pub const RENDER_FAILURE_PLACEHOLDER: &str = "<error getting repr>";

/// Bound names with this prefix are runtime bookkeeping and never shown.
pub const RESERVED_PREFIX: &str = "__";

/// Default maximum length (in characters) of a value preview.
pub const DEFAULT_MAX_VALUE_LEN: usize = 100;

/// Default maximum number of stack entries in a snapshot.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 10;

/// Source position of a pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location
{
    /// Path of the source file, as reported by the runtime.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

/// One entry of the call stack, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackEntry
{
    /// File basename.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
    /// Enclosing callable name.
    pub function: String,
}

/// Immutable rendering of paused program state.
///
/// Built once per pause event. A snapshot without a location is the terminal
/// record emitted when the target failed to load or an exception escaped the
/// top-level frame; it carries only the exception text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot
{
    location: Option<Location>,
    function: Option<String>,
    depth: usize,
    locals: IndexMap<String, String>,
    stack: Vec<StackEntry>,
    exception: Option<String>,
}

impl Snapshot
{
    /// Synthetic record for a target that failed outside any pause.
    #[must_use]
    pub fn terminal(exception: impl Into<String>) -> Self
    {
        Self {
            location: None,
            function: None,
            depth: 0,
            locals: IndexMap::new(),
            stack: Vec::new(),
            exception: Some(exception.into()),
        }
    }

    /// Where the target is paused, `None` for a terminal record.
    #[must_use]
    pub fn location(&self) -> Option<&Location>
    {
        self.location.as_ref()
    }

    /// Name of the paused callable, `None` for a terminal record.
    #[must_use]
    pub fn function(&self) -> Option<&str>
    {
        self.function.as_deref()
    }

    /// Call depth of the paused frame (0 = entry point).
    #[must_use]
    pub fn depth(&self) -> usize
    {
        self.depth
    }

    /// Local bindings as `name -> preview`, in binding order.
    #[must_use]
    pub fn locals(&self) -> &IndexMap<String, String>
    {
        &self.locals
    }

    /// Call stack, innermost frame first.
    #[must_use]
    pub fn stack(&self) -> &[StackEntry]
    {
        &self.stack
    }

    /// Display text of the exception that caused this pause, if any.
    #[must_use]
    pub fn exception(&self) -> Option<&str>
    {
        self.exception.as_deref()
    }

    /// Whether this record corresponds to a pause that awaits a command.
    ///
    /// Terminal records are informational only; nobody is waiting for an
    /// answer to them.
    #[must_use]
    pub fn is_pause(&self) -> bool
    {
        self.location.is_some()
    }
}

/// Bounds applied while building snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotLimits
{
    /// Maximum characters per value preview.
    pub max_value_len: usize,
    /// Maximum number of stack entries.
    pub max_stack_depth: usize,
}

impl Default for SnapshotLimits
{
    fn default() -> Self
    {
        Self {
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

/// Turns execution handles into snapshots.
///
/// The builder never fails: rendering errors and formatter panics are absorbed
/// here and replaced with [`RENDER_FAILURE_PLACEHOLDER`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotBuilder
{
    limits: SnapshotLimits,
}

impl SnapshotBuilder
{
    /// Create a builder with the given bounds.
    #[must_use]
    pub const fn new(limits: SnapshotLimits) -> Self
    {
        Self { limits }
    }

    /// The bounds this builder applies.
    #[must_use]
    pub const fn limits(&self) -> SnapshotLimits
    {
        self.limits
    }

    /// Build a snapshot of `handle`, optionally attaching exception text.
    #[must_use]
    pub fn build(&self, handle: &dyn ExecutionHandle, exception: Option<&str>) -> Snapshot
    {
        let mut locals = IndexMap::new();
        handle.visit_bindings(&mut |name: &str, value: &dyn Displayable| {
            if name.starts_with(RESERVED_PREFIX) {
                return;
            }
            locals.insert(name.to_string(), self.preview(name, value));
        });

        Snapshot {
            location: Some(Location {
                file: handle.file().to_string(),
                line: handle.line(),
            }),
            function: Some(handle.function_name().to_string()),
            depth: handle.depth(),
            locals,
            stack: self.walk_stack(handle),
            exception: exception.map(str::to_string),
        }
    }

    fn preview(&self, name: &str, value: &dyn Displayable) -> String
    {
        match panic::catch_unwind(AssertUnwindSafe(|| value.render())) {
            Ok(Ok(text)) => truncate_chars(&text, self.limits.max_value_len),
            Ok(Err(err)) => {
                warn!("Failed to render value of '{name}': {err}");
                RENDER_FAILURE_PLACEHOLDER.to_string()
            }
            Err(_) => {
                warn!("Formatter panicked while rendering '{name}'");
                RENDER_FAILURE_PLACEHOLDER.to_string()
            }
        }
    }

    fn walk_stack(&self, handle: &dyn ExecutionHandle) -> Vec<StackEntry>
    {
        let mut stack = Vec::new();
        let mut current = Some(handle);
        while let Some(frame) = current {
            if stack.len() >= self.limits.max_stack_depth {
                break;
            }
            stack.push(StackEntry {
                file: basename(frame.file()),
                line: frame.line(),
                function: frame.function_name().to_string(),
            });
            current = frame.parent();
        }
        stack
    }
}

fn truncate_chars(text: &str, max: usize) -> String
{
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

fn basename(path: &str) -> String
{
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::error::RenderError;

    struct Failing;

    impl Displayable for Failing
    {
        fn render(&self) -> Result<String, RenderError>
        {
            Err(RenderError::SelfReferential)
        }
    }

    struct Panicking;

    impl Displayable for Panicking
    {
        fn render(&self) -> Result<String, RenderError>
        {
            panic!("formatter exploded")
        }
    }

    struct TestFrame<'a>
    {
        line: u32,
        function: &'static str,
        bindings: Vec<(&'static str, Box<dyn Displayable>)>,
        parent: Option<&'a TestFrame<'a>>,
    }

    impl<'a> TestFrame<'a>
    {
        fn new(function: &'static str, line: u32, parent: Option<&'a TestFrame<'a>>) -> Self
        {
            Self {
                line,
                function,
                bindings: Vec::new(),
                parent,
            }
        }

        fn bind(mut self, name: &'static str, value: impl Displayable + 'static) -> Self
        {
            self.bindings.push((name, Box::new(value)));
            self
        }
    }

    impl ExecutionHandle for TestFrame<'_>
    {
        fn file(&self) -> &str
        {
            "/home/dev/project/demo.py"
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
            for (name, value) in &self.bindings {
                visitor(name, value.as_ref());
            }
        }

        fn parent(&self) -> Option<&dyn ExecutionHandle>
        {
            self.parent.map(|frame| frame as &dyn ExecutionHandle)
        }
    }

    #[test]
    fn test_reserved_names_are_filtered()
    {
        let frame = TestFrame::new("<module>", 1, None)
            .bind("__name__", "'__main__'".to_string())
            .bind("total", "30".to_string())
            .bind("__file__", "'demo.py'".to_string());

        let snapshot = SnapshotBuilder::default().build(&frame, None);

        assert_eq!(snapshot.locals().len(), 1);
        assert_eq!(snapshot.locals().get("total").map(String::as_str), Some("30"));
    }

    #[test]
    fn test_locals_keep_binding_order()
    {
        let frame = TestFrame::new("calculate", 3, None)
            .bind("b", "20".to_string())
            .bind("a", "10".to_string())
            .bind("total", "30".to_string());

        let snapshot = SnapshotBuilder::default().build(&frame, None);
        let names: Vec<&str> = snapshot.locals().keys().map(String::as_str).collect();

        assert_eq!(names, ["b", "a", "total"]);
    }

    #[test]
    fn test_previews_are_truncated_by_characters()
    {
        let frame = TestFrame::new("f", 1, None)
            .bind("ascii", "x".repeat(500))
            .bind("wide", "é".repeat(50));
        let builder = SnapshotBuilder::new(SnapshotLimits {
            max_value_len: 10,
            max_stack_depth: 10,
        });

        let snapshot = builder.build(&frame, None);

        assert_eq!(snapshot.locals()["ascii"], "x".repeat(10));
        assert_eq!(snapshot.locals()["wide"].chars().count(), 10);
    }

    #[test]
    fn test_render_failure_uses_placeholder()
    {
        let frame = TestFrame::new("f", 7, None)
            .bind("broken", Failing)
            .bind("fine", "1".to_string());

        let snapshot = SnapshotBuilder::default().build(&frame, None);

        assert_eq!(snapshot.locals()["broken"], RENDER_FAILURE_PLACEHOLDER);
        assert_eq!(snapshot.locals()["fine"], "1");
        assert_eq!(snapshot.location().map(|loc| loc.line), Some(7));
    }

    #[test]
    fn test_formatter_panic_uses_placeholder()
    {
        let frame = TestFrame::new("f", 2, None).bind("explosive", Panicking);

        let snapshot = SnapshotBuilder::default().build(&frame, None);

        assert_eq!(snapshot.locals()["explosive"], RENDER_FAILURE_PLACEHOLDER);
    }

    #[test]
    fn test_stack_is_innermost_first_with_basenames()
    {
        let module = TestFrame::new("<module>", 30, None);
        let main = TestFrame::new("main", 19, Some(&module));
        let greet = TestFrame::new("greet", 6, Some(&main));

        let snapshot = SnapshotBuilder::default().build(&greet, None);

        let functions: Vec<&str> = snapshot.stack().iter().map(|entry| entry.function.as_str()).collect();
        assert_eq!(functions, ["greet", "main", "<module>"]);
        assert_eq!(snapshot.stack()[0].file, "demo.py");
        assert_eq!(snapshot.stack()[1].line, 19);
        assert_eq!(snapshot.depth(), 2);
    }

    #[test]
    fn test_stack_depth_is_bounded()
    {
        let limits = SnapshotLimits {
            max_value_len: 100,
            max_stack_depth: 3,
        };
        let f0 = TestFrame::new("f0", 1, None);
        let f1 = TestFrame::new("f1", 2, Some(&f0));
        let f2 = TestFrame::new("f2", 3, Some(&f1));
        let f3 = TestFrame::new("f3", 4, Some(&f2));
        let f4 = TestFrame::new("f4", 5, Some(&f3));

        let snapshot = SnapshotBuilder::new(limits).build(&f4, None);

        assert_eq!(snapshot.stack().len(), 3);
        assert_eq!(snapshot.stack()[0].function, "f4");
        assert_eq!(snapshot.depth(), 4);
    }

    #[test]
    fn test_build_is_deterministic()
    {
        let frame = TestFrame::new("f", 4, None)
            .bind("x", "1".to_string())
            .bind("y", Failing);
        let builder = SnapshotBuilder::default();

        assert_eq!(builder.build(&frame, Some("boom")), builder.build(&frame, Some("boom")));
    }

    #[test]
    fn test_snapshot_serializes_as_flat_record()
    {
        let module = TestFrame::new("<module>", 12, None);
        let frame = TestFrame::new("greet", 3, Some(&module)).bind("name", "'Bob'".to_string());

        let json = serde_json::to_value(SnapshotBuilder::default().build(&frame, None)).unwrap();

        assert_eq!(json["location"]["file"], "/home/dev/project/demo.py");
        assert_eq!(json["location"]["line"], 3);
        assert_eq!(json["function"], "greet");
        assert_eq!(json["depth"], 1);
        assert_eq!(json["locals"]["name"], "'Bob'");
        assert_eq!(json["stack"][1]["function"], "<module>");
        assert!(json["exception"].is_null());
    }

    #[test]
    fn test_terminal_snapshot_carries_only_exception()
    {
        let snapshot = Snapshot::terminal("boom");

        assert_eq!(snapshot.exception(), Some("boom"));
        assert!(snapshot.location().is_none());
        assert!(snapshot.locals().is_empty());
        assert!(snapshot.stack().is_empty());
        assert!(!snapshot.is_pause());
    }
}
