//! Headless line-oriented observer
//!
//! Prints every snapshot and reads one command per line. Useful for scripted
//! sessions and for terminals where the TUI cannot run.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use stepwise_core::{Command, Exit, Session, Snapshot};
use stepwise_utils::{debug, info};

/// How snapshots are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleFormat
{
    /// Human-readable blocks
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for ConsoleFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use 'text' or 'json'")),
        }
    }
}

/// Headless observer over arbitrary input and output streams
pub struct Console<R, W>
{
    input: R,
    output: W,
    format: ConsoleFormat,
}

impl<R: BufRead, W: Write> Console<R, W>
{
    pub const fn new(input: R, output: W, format: ConsoleFormat) -> Self
    {
        Self { input, output, format }
    }

    /// Drive `session` until the target ends or the operator quits.
    ///
    /// End of input counts as `quit`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading commands or writing snapshots fails. The
    /// session is still joined in that case, terminating the target.
    pub fn run(mut self, session: Session) -> io::Result<Exit>
    {
        let result = self.drive(&session);
        let exit = session.join();
        info!("Headless session ended: {exit:?}");
        result.map(|()| exit)
    }

    fn drive(&mut self, session: &Session) -> io::Result<()>
    {
        while let Some(snapshot) = session.next_snapshot() {
            self.print(&snapshot)?;
            if !snapshot.is_pause() {
                continue;
            }
            let command = self.read_command()?;
            debug!("Operator command: {command}");
            if session.send(command).is_err() || command == Command::Quit {
                break;
            }
        }
        Ok(())
    }

    fn read_command(&mut self) -> io::Result<Command>
    {
        loop {
            if self.format == ConsoleFormat::Text {
                write!(self.output, "(stepwise) ")?;
                self.output.flush()?;
            }

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Command::Quit);
            }
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => return Ok(command),
                Err(err) => writeln!(self.output, "{err} (use s, n, c or q)")?,
            }
        }
    }

    fn print(&mut self, snapshot: &Snapshot) -> io::Result<()>
    {
        match self.format {
            ConsoleFormat::Json => {
                serde_json::to_writer(&mut self.output, snapshot)?;
                writeln!(self.output)?;
            }
            ConsoleFormat::Text => write_text(&mut self.output, snapshot)?,
        }
        self.output.flush()
    }
}

/// Render a snapshot as a text block.
///
/// # Errors
///
/// Returns any error from `out`.
pub fn write_text(out: &mut impl Write, snapshot: &Snapshot) -> io::Result<()>
{
    let Some(location) = snapshot.location() else {
        return writeln!(out, "Exception: {}", snapshot.exception().unwrap_or_default());
    };

    writeln!(
        out,
        "> {}:{} in {}",
        location.file,
        location.line,
        snapshot.function().unwrap_or_default()
    )?;
    if let Some(exception) = snapshot.exception() {
        writeln!(out, "  Exception: {exception}")?;
    }
    if snapshot.locals().is_empty() {
        writeln!(out, "  No local variables")?;
    }
    for (name, value) in snapshot.locals() {
        writeln!(out, "  {name} = {value}")?;
    }
    for (i, entry) in snapshot.stack().iter().enumerate() {
        let marker = if i == 0 { "→" } else { " " };
        writeln!(out, "  {marker} {} ({}:{})", entry.function, entry.file, entry.line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_format_from_str()
    {
        assert_eq!("TEXT".parse::<ConsoleFormat>().unwrap(), ConsoleFormat::Text);
        assert_eq!("json".parse::<ConsoleFormat>().unwrap(), ConsoleFormat::Json);
        assert!("yaml".parse::<ConsoleFormat>().is_err());
    }

    #[test]
    fn test_terminal_snapshot_text()
    {
        let mut out = Vec::new();
        write_text(&mut out, &Snapshot::terminal("boom")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Exception: boom\n");
    }
}
