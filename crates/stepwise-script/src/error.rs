//! Errors raised while loading a script.
//!
//! Runtime failures inside a running script are not Rust errors: they are
//! script exceptions and travel through the interpreter's unwinding path.

use std::path::PathBuf;

use thiserror::Error;

/// A script could not be turned into a runnable program
#[derive(Error, Debug)]
pub enum ScriptError
{
    /// The script file does not exist
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    /// The script file exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tokenizing or parsing failed
    #[error("SyntaxError: {message} (line {line})")]
    Syntax
    {
        line: u32,
        message: String,
    },

    /// Inconsistent indentation
    #[error("IndentationError: {message} (line {line})")]
    Indentation
    {
        line: u32,
        message: String,
    },
}

impl ScriptError
{
    pub(crate) fn syntax(line: u32, message: impl Into<String>) -> Self
    {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn indentation(line: u32, message: impl Into<String>) -> Self
    {
        Self::Indentation {
            line,
            message: message.into(),
        }
    }

    /// Line the error points at, if it came from the source text.
    #[must_use]
    pub const fn line(&self) -> Option<u32>
    {
        match self {
            Self::Syntax { line, .. } | Self::Indentation { line, .. } => Some(*line),
            Self::NotFound(_) | Self::Io { .. } => None,
        }
    }
}

/// Convenience type alias for `Result<T, ScriptError>`
pub type Result<T> = std::result::Result<T, ScriptError>;
