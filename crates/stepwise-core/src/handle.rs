//! # Execution Handles
//!
//! The two traits a language runtime implements so the engine can look at a
//! paused program without knowing anything about the runtime itself.
//!
//! - [`ExecutionHandle`]: one live frame of the target's call stack.
//! - [`Displayable`]: a bound value that knows how to render a short preview.
//!
//! Handles are borrowed, never owned, by the engine. They are only valid for
//! the duration of a single hook callback, which is exactly as long as the
//! execution context stays paused.

use crate::error::RenderError;

/// A value that can produce a display string for the variables pane
///
/// Rendering is allowed to fail. Implementations should return an error
/// rather than panic, but the snapshot builder guards against both.
pub trait Displayable
{
    /// Render the value as a short, human-readable string.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] when the value cannot be rendered (it is
    /// self-referential, currently borrowed, holds a released resource, ...).
    fn render(&self) -> Result<String, RenderError>;
}

impl Displayable for str
{
    fn render(&self) -> Result<String, RenderError>
    {
        Ok(self.to_string())
    }
}

impl Displayable for String
{
    fn render(&self) -> Result<String, RenderError>
    {
        Ok(self.clone())
    }
}

/// Opaque reference to one paused point in the target's call stack
///
/// Frames form a singly linked list through [`ExecutionHandle::parent`], from
/// the innermost frame up to the entry point.
pub trait ExecutionHandle
{
    /// Path of the source file this frame is executing.
    fn file(&self) -> &str;

    /// 1-based line number of the statement about to run.
    fn line(&self) -> u32;

    /// Name of the enclosing callable (`<module>` for top-level code).
    fn function_name(&self) -> &str;

    /// Visit every bound local name in insertion order.
    fn visit_bindings(&self, visitor: &mut dyn FnMut(&str, &dyn Displayable));

    /// The calling frame, or `None` at the entry point.
    fn parent(&self) -> Option<&dyn ExecutionHandle>;

    /// Position of this frame in the call chain (the entry point is depth 0).
    ///
    /// The default walks the parent chain; runtimes that already track the
    /// depth should override it.
    fn depth(&self) -> usize
    {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(frame) = current {
            depth += 1;
            current = frame.parent();
        }
        depth
    }
}
