//! Terminal User Interface initialization and management

use std::io::{self, Stdout, Write};
use std::panic;
use std::thread;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use stepwise_core::session::EXECUTION_THREAD_NAME;
use stepwise_core::Exit;
use stepwise_utils::{info, warn};

use crate::app::App;
use crate::event::{Event, EventHandler};
use crate::output::OutputReceiver;

/// Terminal User Interface for the stepwise debugger
///
/// Owns the terminal while a session runs: raw mode and the alternate screen
/// are entered on construction and restored on drop.
pub struct Tui
{
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui
{
    /// Create a new TUI instance
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization fails (raw mode, alternate screen, etc.)
    pub fn new() -> io::Result<Self>
    {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        // A panic in the target is contained by the session runner and must
        // not tear the terminal down under the running TUI.
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            if thread::current().name() != Some(EXECUTION_THREAD_NAME) {
                let _ = Self::restore();
            }
            original_hook(panic_info);
        }));

        Ok(Self { terminal })
    }

    /// Run the TUI event loop until the operator quits
    ///
    /// Returns how the target ended.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal drawing fails or terminal restoration fails
    pub async fn run(&mut self, mut app: App, output: OutputReceiver, poll_interval: Duration) -> io::Result<Exit>
    {
        info!("Stepwise TUI started for {}", app.script);

        let mut events = EventHandler::new(poll_interval);
        let forwarder = events.forward_output(output);

        loop {
            self.terminal.draw(|frame| crate::ui::draw(frame, &app))?;

            match events.next().await {
                Some(Event::Key(key)) => {
                    if app.handle_key_event(key) {
                        break;
                    }
                }
                Some(Event::Tick) => app.tick(),
                Some(Event::Output(line)) => app.push_output(line),
                None => break,
            }

            if app.should_quit {
                break;
            }
        }

        info!("Stepwise TUI closing");
        Self::restore()?;

        events.abort();
        if tokio::time::timeout(Duration::from_millis(100), forwarder).await.is_err() {
            warn!("Output forwarder didn't finish in time, dropping");
        }

        let exit = tokio::task::spawn_blocking(move || app.finish())
            .await
            .unwrap_or_else(|err| Exit::Failed(format!("execution thread panicked: {err}")));
        let _ = io::stdout().flush();

        info!("Stepwise TUI closed ({exit:?})");
        Ok(exit)
    }

    /// Restore the terminal to its original state
    ///
    /// # Errors
    ///
    /// Returns an error if disabling raw mode or leaving the alternate screen fails
    pub fn restore() -> io::Result<()>
    {
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        Ok(())
    }
}

impl Drop for Tui
{
    fn drop(&mut self)
    {
        let _ = Self::restore();
    }
}
