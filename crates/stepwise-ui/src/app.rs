//! Application state and logic

use std::collections::VecDeque;
use std::fs;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use stepwise_core::{Command, Exit, Session, Snapshot};
use stepwise_utils::{debug, warn};

/// Maximum number of output lines retained in memory.
const MAX_OUTPUT_LINES: usize = 4096;

/// Source text of the file the target is paused in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceView
{
    pub path: String,
    /// The file's lines, or why they could not be read.
    pub lines: Result<Vec<String>, String>,
}

impl SourceView
{
    /// Read `path` from disk. A read failure is kept for display, not returned.
    #[must_use]
    pub fn load(path: &str) -> Self
    {
        let lines = fs::read_to_string(path)
            .map(|text| text.lines().map(str::to_string).collect())
            .map_err(|err| {
                warn!("Could not read source file {path}: {err}");
                err.to_string()
            });
        Self {
            path: path.to_string(),
            lines,
        }
    }
}

/// What the target is doing, as far as the observer knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState
{
    /// No snapshot has arrived yet, or a command was sent and the target is
    /// running until its next pause
    Running,
    /// The latest snapshot is a pause waiting for a command
    Paused,
    /// The snapshot channel disconnected
    Finished,
}

/// Application state
pub struct App
{
    session: Session,
    /// Script path as given on the command line
    pub script: String,
    /// Most recent snapshot
    pub snapshot: Option<Snapshot>,
    pub state: RunState,
    /// Source of the file named by the latest location
    pub source: Option<SourceView>,
    /// Lines printed by the target
    pub output: VecDeque<String>,
    /// Number of lines scrolled back from the end of the output buffer
    pub output_scrollback: usize,
    /// Transient message shown in the footer
    pub message: Option<String>,
    /// Whether the application should exit
    pub should_quit: bool,
}

impl App
{
    #[must_use]
    pub fn new(session: Session, script: impl Into<String>) -> Self
    {
        Self {
            session,
            script: script.into(),
            snapshot: None,
            state: RunState::Running,
            source: None,
            output: VecDeque::new(),
            output_scrollback: 0,
            message: None,
            should_quit: false,
        }
    }

    /// Pull the latest snapshot from the session (called on each tick).
    ///
    /// Intermediate snapshots are skipped; only the newest one is shown.
    pub fn tick(&mut self)
    {
        let drain = self.session.drain_latest();
        if drain.drained > 1 {
            debug!("Skipped {} stale snapshots", drain.drained - 1);
        }
        if let Some(snapshot) = drain.latest {
            self.show(snapshot);
        }
        if drain.disconnected && self.state != RunState::Finished {
            debug!("Snapshot channel disconnected");
            self.state = RunState::Finished;
        }
    }

    fn show(&mut self, snapshot: Snapshot)
    {
        if let Some(location) = snapshot.location() {
            let stale = self.source.as_ref().is_none_or(|source| source.path != location.file);
            if stale {
                self.source = Some(SourceView::load(&location.file));
            }
        }
        self.state = if snapshot.is_pause() {
            RunState::Paused
        } else {
            RunState::Running
        };
        self.snapshot = Some(snapshot);
    }

    /// Answer the current pause.
    pub fn send(&mut self, command: Command)
    {
        match self.state {
            RunState::Paused => match self.session.send(command) {
                Ok(()) => {
                    debug!("Sent {command}");
                    self.state = RunState::Running;
                }
                Err(err) => self.message = Some(err.to_string()),
            },
            RunState::Running => self.message = Some("Program is running".to_string()),
            RunState::Finished => self.message = Some("Program finished, press q to exit".to_string()),
        }
    }

    /// Stop the target, paused or running, and leave the UI.
    fn quit(&mut self)
    {
        if self.state != RunState::Finished {
            // The target may have finished since the last tick.
            if let Err(err) = self.session.send(Command::Quit) {
                debug!("Quit not delivered: {err}");
            }
        }
        self.should_quit = true;
    }

    /// Handle a keyboard event
    ///
    /// Returns `true` if the application should quit, `false` otherwise.
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> bool
    {
        self.message = None;

        match key_event.code {
            KeyCode::Char('q' | 'Q') | KeyCode::Esc => {
                self.quit();
                return true;
            }
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return true;
            }
            KeyCode::Char('s') => self.send(Command::StepInto),
            KeyCode::Char('n') => self.send(Command::StepOver),
            KeyCode::Char('c') => self.send(Command::Continue),
            KeyCode::Up => self.scroll_output_up(),
            KeyCode::Down => self.scroll_output_down(),
            _ => {}
        }

        false
    }

    /// Append a line printed by the target.
    pub fn push_output(&mut self, line: String)
    {
        self.output.push_back(line);
        if self.output.len() > MAX_OUTPUT_LINES {
            self.output.pop_front();
        }

        let max_scroll = self.output.len().saturating_sub(1);
        if self.output_scrollback > max_scroll {
            self.output_scrollback = max_scroll;
        }
    }

    fn scroll_output_up(&mut self)
    {
        let max_scroll = self.output.len().saturating_sub(1);
        if self.output_scrollback < max_scroll {
            self.output_scrollback += 1;
        }
    }

    fn scroll_output_down(&mut self)
    {
        self.output_scrollback = self.output_scrollback.saturating_sub(1);
    }

    /// Wait for the execution thread. A target still paused is terminated.
    #[must_use]
    pub fn finish(self) -> Exit
    {
        self.session.join()
    }
}
