//! # Error Types
//!
//! General error handling for the debugger control engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Only a handful of things can genuinely fail inside the engine: one side of
//! the channel pair hanging up, or the execution thread failing to start.
//! Failures that belong to the target program never show up here, they travel
//! to the observer inside a [`Snapshot`](crate::snapshot::Snapshot).

use thiserror::Error;

/// Main error type for debugger operations
///
/// ## Error Categories
///
/// 1. **Channel errors**: ObserverDisconnected, ExecutionDisconnected
/// 2. **Session errors**: SpawnFailed
/// 3. **Input errors**: UnknownCommand
#[derive(Error, Debug)]
pub enum DebuggerError
{
    /// The observer dropped its end of the channel pair
    ///
    /// The execution context treats this exactly like an operator `Quit`:
    /// nobody is left to issue commands, so the target is terminated at the
    /// current checkpoint.
    #[error("Observer disconnected")]
    ObserverDisconnected,

    /// The execution context is gone and can no longer receive commands
    ///
    /// This happens when a command is sent after the target finished, was
    /// terminated, or failed to load.
    #[error("Execution context has finished")]
    ExecutionDisconnected,

    /// Failed to start the dedicated execution thread
    #[error("Failed to spawn execution thread: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// Text could not be parsed into an operator command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Why a value could not be turned into its display string
///
/// A [`Displayable`](crate::handle::Displayable) returns this instead of a
/// string. The snapshot builder absorbs it and substitutes a placeholder, so a
/// `RenderError` never reaches the observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError
{
    /// The value contains itself
    #[error("value contains a reference to itself")]
    SelfReferential,

    /// The value is currently borrowed or otherwise unavailable for reading
    #[error("value is unavailable: {0}")]
    Unavailable(String),

    /// Any other formatter failure
    #[error("{0}")]
    Failed(String),
}

/// Convenience type alias for `Result<T, DebuggerError>`
///
/// ```rust
/// use stepwise_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DebuggerError>;
