//! Event handling for the TUI

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::output::OutputReceiver;

/// Default interval between snapshot polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Events that can occur in the TUI
#[derive(Debug, Clone)]
pub enum Event
{
    /// Keyboard input event
    Key(KeyEvent),
    /// Time to poll the snapshot queue
    Tick,
    /// A line printed by the target
    Output(String),
}

/// Event handler that reads from crossterm and produces TUI events
pub struct EventHandler
{
    receiver: mpsc::Receiver<Event>,
    sender: mpsc::Sender<Event>,
    should_stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl EventHandler
{
    /// Spawn a blocking task that turns key presses into events and emits a
    /// [`Event::Tick`] every `tick_rate`.
    #[must_use]
    pub fn new(tick_rate: Duration) -> Self
    {
        let (sender, receiver) = mpsc::channel(100);
        let should_stop = Arc::new(AtomicBool::new(false));

        let events = sender.clone();
        let stop = Arc::clone(&should_stop);
        let handle = tokio::task::spawn_blocking(move || {
            let mut last_tick = Instant::now();
            while !stop.load(Ordering::Relaxed) {
                let timeout = tick_rate.saturating_sub(last_tick.elapsed());

                if event::poll(timeout).unwrap_or(false) {
                    if let Ok(CrosstermEvent::Key(key)) = event::read() {
                        if key.kind == KeyEventKind::Press && events.blocking_send(Event::Key(key)).is_err() {
                            break;
                        }
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if events.blocking_send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self {
            receiver,
            sender,
            should_stop,
            handle,
        }
    }

    /// Forward the target's printed lines into the event queue.
    pub fn forward_output(&self, mut output: OutputReceiver) -> JoinHandle<()>
    {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            while let Some(line) = output.recv().await {
                if sender.send(Event::Output(line)).await.is_err() {
                    break;
                }
            }
        })
    }

    /// Stop the background task on its next iteration.
    pub fn stop(&mut self)
    {
        self.should_stop.store(true, Ordering::Relaxed);
        self.receiver.close();
    }

    /// Stop and abort the background task without waiting for it.
    pub fn abort(&mut self)
    {
        self.stop();
        self.handle.abort();
    }

    /// Get the next event (async)
    pub async fn next(&mut self) -> Option<Event>
    {
        self.receiver.recv().await
    }
}

impl Drop for EventHandler
{
    fn drop(&mut self)
    {
        self.stop();
    }
}
