//! The command/state channel pair.
//!
//! Two unbounded one-way queues are the only coupling between the execution
//! context and the observer: snapshots travel outward, commands travel inward.
//! Each side owns one endpoint. When the execution context finishes, its
//! endpoint is dropped and the observer sees the snapshot queue disconnect.

use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use crate::command::Command;
use crate::error::{DebuggerError, Result};
use crate::snapshot::Snapshot;

/// Sender side of the snapshot channel.
pub type SnapshotSender = mpsc::Sender<Snapshot>;
/// Receiver side of the snapshot channel.
pub type SnapshotReceiver = mpsc::Receiver<Snapshot>;
/// Sender side of the command channel.
pub type CommandSender = mpsc::Sender<Command>;
/// Receiver side of the command channel.
pub type CommandReceiver = mpsc::Receiver<Command>;

/// Create both queues and split them into the two endpoints.
#[must_use]
pub fn channel_pair() -> (ExecutionEndpoint, ObserverEndpoint)
{
    let (snapshot_tx, snapshot_rx) = mpsc::channel();
    let (command_tx, command_rx) = mpsc::channel();
    (
        ExecutionEndpoint {
            snapshots: snapshot_tx,
            commands: command_rx,
        },
        ObserverEndpoint {
            snapshots: snapshot_rx,
            commands: command_tx,
        },
    )
}

/// The execution context's end: publishes snapshots, blocks on commands.
#[derive(Debug)]
pub struct ExecutionEndpoint
{
    snapshots: SnapshotSender,
    commands: CommandReceiver,
}

impl ExecutionEndpoint
{
    /// Publish a snapshot. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::ObserverDisconnected`] if the observer is gone.
    pub fn publish(&self, snapshot: Snapshot) -> Result<()>
    {
        self.snapshots
            .send(snapshot)
            .map_err(|_| DebuggerError::ObserverDisconnected)
    }

    /// Block until exactly one command arrives.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::ObserverDisconnected`] if the observer is gone.
    pub fn await_command(&self) -> Result<Command>
    {
        self.commands.recv().map_err(|_| DebuggerError::ObserverDisconnected)
    }

    /// Take a command if one is already queued. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::ObserverDisconnected`] if the observer is gone.
    pub fn poll_command(&self) -> Result<Option<Command>>
    {
        match self.commands.try_recv() {
            Ok(command) => Ok(Some(command)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(DebuggerError::ObserverDisconnected),
        }
    }
}

/// Result of draining the snapshot queue.
#[derive(Debug, Default)]
pub struct Drain
{
    /// The most recent snapshot, if any arrived since the last drain.
    pub latest: Option<Snapshot>,
    /// How many snapshots were taken off the queue (superseded ones included).
    pub drained: usize,
    /// The execution context has finished and no more snapshots will come.
    pub disconnected: bool,
}

/// The observer's end: drains snapshots, sends commands.
#[derive(Debug)]
pub struct ObserverEndpoint
{
    snapshots: SnapshotReceiver,
    commands: CommandSender,
}

impl ObserverEndpoint
{
    /// Take every queued snapshot without blocking, keeping only the latest.
    #[must_use]
    pub fn drain_latest(&self) -> Drain
    {
        let mut drain = Drain::default();
        loop {
            match self.snapshots.try_recv() {
                Ok(snapshot) => {
                    drain.latest = Some(snapshot);
                    drain.drained += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    drain.disconnected = true;
                    break;
                }
            }
        }
        drain
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the execution context has finished and the queue
    /// is empty.
    #[must_use]
    pub fn next_snapshot(&self) -> Option<Snapshot>
    {
        self.snapshots.recv().ok()
    }

    /// Wait up to `timeout` for the next snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::ExecutionDisconnected`] once the execution
    /// context has finished and the queue is empty.
    pub fn next_snapshot_timeout(&self, timeout: Duration) -> Result<Option<Snapshot>>
    {
        match self.snapshots.recv_timeout(timeout) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DebuggerError::ExecutionDisconnected),
        }
    }

    /// Queue a command for the execution context.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::ExecutionDisconnected`] if the execution
    /// context has already finished.
    pub fn send(&self, command: Command) -> Result<()>
    {
        self.commands
            .send(command)
            .map_err(|_| DebuggerError::ExecutionDisconnected)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_drain_keeps_latest_snapshot()
    {
        let (execution, observer) = channel_pair();
        execution.publish(Snapshot::terminal("first")).unwrap();
        execution.publish(Snapshot::terminal("second")).unwrap();
        execution.publish(Snapshot::terminal("third")).unwrap();

        let drain = observer.drain_latest();

        assert_eq!(drain.drained, 3);
        assert_eq!(drain.latest.unwrap().exception(), Some("third"));
        assert!(!drain.disconnected);
        assert!(observer.drain_latest().latest.is_none());
    }

    #[test]
    fn test_drain_reports_disconnect_after_queued_snapshots()
    {
        let (execution, observer) = channel_pair();
        execution.publish(Snapshot::terminal("last words")).unwrap();
        drop(execution);

        let drain = observer.drain_latest();

        assert_eq!(drain.latest.unwrap().exception(), Some("last words"));
        assert!(drain.disconnected);
    }

    #[test]
    fn test_commands_arrive_in_order()
    {
        let (execution, observer) = channel_pair();
        observer.send(Command::StepInto).unwrap();
        observer.send(Command::StepOver).unwrap();
        observer.send(Command::Quit).unwrap();

        assert_eq!(execution.await_command().unwrap(), Command::StepInto);
        assert_eq!(execution.await_command().unwrap(), Command::StepOver);
        assert_eq!(execution.await_command().unwrap(), Command::Quit);
    }

    #[test]
    fn test_send_after_execution_finished_fails()
    {
        let (execution, observer) = channel_pair();
        drop(execution);

        assert!(matches!(
            observer.send(Command::Continue),
            Err(DebuggerError::ExecutionDisconnected)
        ));
    }

    #[test]
    fn test_await_command_fails_when_observer_is_gone()
    {
        let (execution, observer) = channel_pair();
        drop(observer);

        assert!(matches!(execution.await_command(), Err(DebuggerError::ObserverDisconnected)));
        assert!(execution.publish(Snapshot::terminal("unseen")).is_err());
    }

    #[test]
    fn test_poll_command_does_not_block()
    {
        let (execution, observer) = channel_pair();
        assert_eq!(execution.poll_command().unwrap(), None);

        observer.send(Command::Quit).unwrap();
        assert_eq!(execution.poll_command().unwrap(), Some(Command::Quit));

        drop(observer);
        assert!(matches!(execution.poll_command(), Err(DebuggerError::ObserverDisconnected)));
    }
}
