//! Operator commands and the resume directives they translate into.

use std::fmt;
use std::str::FromStr;

use crate::error::DebuggerError;

/// Operator command answering exactly one pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command
{
    /// Break again on the very next statement, whatever its depth.
    StepInto,
    /// Break again once control is back in this frame or an enclosing one.
    StepOver,
    /// Run until the next exception or the end of the program.
    Continue,
    /// Stop the target at this checkpoint.
    Quit,
}

impl Command
{
    /// Translate the command into a resume directive for a pause at `depth`.
    #[must_use]
    pub const fn directive(self, depth: usize) -> ResumeMode
    {
        match self {
            Self::StepInto => ResumeMode::SingleStep,
            Self::StepOver => ResumeMode::StepOver { depth },
            Self::Continue => ResumeMode::Continue,
            Self::Quit => ResumeMode::Terminate,
        }
    }
}

impl FromStr for Command
{
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "s" | "step" | "step-into" => Ok(Self::StepInto),
            "n" | "next" | "step-over" => Ok(Self::StepOver),
            "c" | "cont" | "continue" => Ok(Self::Continue),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            other => Err(DebuggerError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            Self::StepInto => "step",
            Self::StepOver => "next",
            Self::Continue => "continue",
            Self::Quit => "quit",
        };
        f.write_str(name)
    }
}

/// How the runtime should proceed after a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode
{
    /// Pause before the next statement at any depth.
    SingleStep,
    /// Pause before the next statement at `depth` or shallower.
    StepOver
    {
        /// Depth of the frame the directive was issued in.
        depth: usize,
    },
    /// Only exceptions pause.
    Continue,
    /// Abort the target.
    Terminate,
}

impl ResumeMode
{
    /// Whether a statement about to run at `depth` should pause.
    ///
    /// Exceptions are not subject to this check; they always pause unless
    /// the target is being terminated.
    #[must_use]
    pub const fn breaks_at_line(self, depth: usize) -> bool
    {
        match self {
            Self::SingleStep => true,
            Self::StepOver { depth: issued } => depth <= issued,
            Self::Continue | Self::Terminate => false,
        }
    }

    /// Whether this directive aborts the target.
    #[must_use]
    pub const fn is_terminate(self) -> bool
    {
        matches!(self, Self::Terminate)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_command_from_str()
    {
        assert_eq!(Command::from_str("s").unwrap(), Command::StepInto);
        assert_eq!(Command::from_str("next").unwrap(), Command::StepOver);
        assert_eq!(Command::from_str(" C \n").unwrap(), Command::Continue);
        assert_eq!(Command::from_str("quit").unwrap(), Command::Quit);
        assert!(Command::from_str("jump").is_err());
    }

    #[test]
    fn test_command_directive()
    {
        assert_eq!(Command::StepInto.directive(3), ResumeMode::SingleStep);
        assert_eq!(Command::StepOver.directive(3), ResumeMode::StepOver { depth: 3 });
        assert_eq!(Command::Continue.directive(3), ResumeMode::Continue);
        assert!(Command::Quit.directive(3).is_terminate());
    }

    #[test]
    fn test_step_over_breaks_only_at_or_above_issuing_depth()
    {
        let mode = ResumeMode::StepOver { depth: 1 };
        assert!(mode.breaks_at_line(0));
        assert!(mode.breaks_at_line(1));
        assert!(!mode.breaks_at_line(2));
    }

    #[test]
    fn test_single_step_and_continue()
    {
        assert!(ResumeMode::SingleStep.breaks_at_line(42));
        assert!(!ResumeMode::Continue.breaks_at_line(0));
        assert!(!ResumeMode::Terminate.breaks_at_line(0));
    }
}
