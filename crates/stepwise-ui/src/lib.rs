//! # stepwise-ui
//!
//! Observers for the stepwise debugger.
//!
//! An observer never touches the target: it consumes
//! [`Snapshot`](stepwise_core::Snapshot)s from a
//! [`Session`](stepwise_core::Session) and answers each pause with a
//! [`Command`](stepwise_core::Command). Two are provided:
//!
//! - [`Tui`]: a `ratatui` interface with code, variables, stack and output
//!   panes, polling the snapshot queue on a fixed tick
//! - [`Console`]: a headless line-oriented observer printing text or JSON
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use stepwise_core::{SessionConfig, spawn_session};
//! use stepwise_script::ScriptTarget;
//! use stepwise_ui::{OutputWriter, run_tui};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (writer, output) = OutputWriter::channel();
//! let session = spawn_session(SessionConfig::default(), move || {
//!     ScriptTarget::load("app.py", Box::new(writer))
//! })?;
//! let exit = run_tui(session, "app.py", output, Duration::from_millis(50)).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod console;
pub mod event;
pub mod output;
pub mod tui;
pub mod ui;
pub mod widgets;

use std::io;
use std::time::Duration;

pub use app::{App, RunState};
pub use console::{Console, ConsoleFormat};
pub use output::{OutputReceiver, OutputWriter};
use stepwise_core::{Exit, Session};
pub use tui::Tui;

/// Run the TUI over a session until the operator quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up, drawn or restored.
pub async fn run_tui(session: Session, script: &str, output: OutputReceiver, poll_interval: Duration) -> io::Result<Exit>
{
    let mut tui = Tui::new()?;
    tui.run(App::new(session, script), output, poll_interval).await
}

/// Run the headless console on stdin/stdout.
///
/// # Errors
///
/// Returns an error if stdin or stdout fails.
pub fn run_headless(session: Session, format: ConsoleFormat) -> io::Result<Exit>
{
    let stdin = io::stdin();
    Console::new(stdin.lock(), io::stdout(), format).run(session)
}
