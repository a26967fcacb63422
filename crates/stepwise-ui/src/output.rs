//! Capturing the target's printed output for the TUI

use std::io::{self, Write};

use tokio::sync::mpsc;

/// Receives whole lines printed by the target.
pub type OutputReceiver = mpsc::UnboundedReceiver<String>;

/// A [`Write`] sink that forwards complete lines to the TUI's output pane.
///
/// The target writes from the execution thread; the TUI reads on its own
/// schedule. Once the TUI is gone, output is discarded rather than failing
/// the target.
#[derive(Debug)]
pub struct OutputWriter
{
    sender: mpsc::UnboundedSender<String>,
    pending: Vec<u8>,
}

impl OutputWriter
{
    /// Create a writer and the receiver its lines arrive on.
    #[must_use]
    pub fn channel() -> (Self, OutputReceiver)
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                pending: Vec::new(),
            },
            receiver,
        )
    }

    fn emit(&mut self, bytes: &[u8])
    {
        let line = String::from_utf8_lossy(bytes).trim_end_matches('\r').to_string();
        let _ = self.sender.send(line);
    }
}

impl Write for OutputWriter
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        self.pending.extend_from_slice(buf);
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.emit(&line[..line.len() - 1]);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()>
    {
        Ok(())
    }
}

impl Drop for OutputWriter
{
    fn drop(&mut self)
    {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest);
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_splits_into_lines()
    {
        let (mut writer, mut receiver) = OutputWriter::channel();
        writer.write_all(b"hello\nwor").unwrap();
        writer.write_all(b"ld\r\n").unwrap();

        assert_eq!(receiver.try_recv().unwrap(), "hello");
        assert_eq!(receiver.try_recv().unwrap(), "world");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_partial_line_is_emitted_on_drop()
    {
        let (mut writer, mut receiver) = OutputWriter::channel();
        writer.write_all(b"no newline").unwrap();
        drop(writer);

        assert_eq!(receiver.try_recv().unwrap(), "no newline");
    }

    #[test]
    fn test_closed_receiver_does_not_fail_writes()
    {
        let (mut writer, receiver) = OutputWriter::channel();
        drop(receiver);
        assert!(writeln!(writer, "ignored").is_ok());
    }
}
