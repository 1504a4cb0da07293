//! # Line Capture Ingestor
//!
//! Reads a stream one line at a time and tees it:
//!
//! - **Echo**: every line is written unchanged, followed by `\n`, to the echo
//!   output and flushed, so a downstream consumer sees exactly what it would
//!   have seen without the tool in the pipe.
//! - **Capture**: the same bytes are appended to an accumulation buffer. Once
//!   the buffer reaches the configured threshold it is handed to the
//!   [`LogSink`] as one block and cleared. A non-empty remainder is handed over
//!   at end of stream.
//!
//! Lines are raw bytes; input that is not valid UTF-8 passes through untouched.
//! A sink failure is counted and logged, and the block is dropped. An echo
//! failure (for example a closed pipe) turns echoing off while capture goes on.

use std::io::{BufRead, ErrorKind, Write};
use std::sync::Arc;

use crate::configs::config_txtlog::DEFAULT_CAPTURE_BUFFER_SIZE;
use crate::loggers::error::Result;
use crate::loggers::txtlog::TxtLog;

/// Destination for captured blocks.
pub trait LogSink {
    /// Writes one accumulated block.
    fn write_block(&self, block: &[u8]) -> Result<()>;

    /// Pushes buffered data to storage at end of capture.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

impl LogSink for TxtLog {
    fn write_block(&self, block: &[u8]) -> Result<()> {
        self.write(block)
    }

    fn flush(&self) -> Result<()> {
        TxtLog::flush(self)
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write_block(&self, block: &[u8]) -> Result<()> {
        (**self).write_block(block)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

impl<S: LogSink + ?Sized> LogSink for &S {
    fn write_block(&self, block: &[u8]) -> Result<()> {
        (**self).write_block(block)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

/// Counters for one capture run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    /// Lines read from the input.
    pub lines: u64,
    /// Bytes handed to the sink or dropped by a failed write, newlines included.
    pub bytes: u64,
    /// Blocks the sink accepted.
    pub blocks_written: u64,
    /// Blocks the sink rejected.
    pub failed_writes: u64,
}

/// # Capture Loop
///
/// Tees lines from a reader to an echo output and a [`LogSink`].
#[derive(Debug)]
pub struct CaptureLoop<S> {
    sink: S,
    buffer_size: usize,
    echo: bool,
}

impl<S: LogSink> CaptureLoop<S> {
    /// Creates a loop that hands blocks of at least `buffer_size` bytes to `sink`.
    ///
    /// A `buffer_size` of `0` hands every line over on its own.
    pub fn new(sink: S, buffer_size: usize) -> Self {
        Self {
            sink,
            buffer_size,
            echo: true,
        }
    }

    /// Creates a loop with the default threshold.
    pub fn with_default_buffer(sink: S) -> Self {
        Self::new(sink, DEFAULT_CAPTURE_BUFFER_SIZE)
    }

    /// Turns echoing on or off.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// The sink captured blocks are handed to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs until `input` reaches end of stream or fails to read.
    pub fn run<R, W>(&self, mut input: R, mut output: W) -> CaptureStats
    where
        R: BufRead,
        W: Write,
    {
        let mut stats = CaptureStats::default();
        let mut echo = self.echo;
        let mut line = Vec::new();
        let mut pending: Vec<u8> = Vec::with_capacity(self.buffer_size.saturating_add(1));

        loop {
            line.clear();
            match input.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!(error = %e, "input read failed, ending capture");
                    break;
                }
            }

            if line.last() == Some(&b'\n') {
                line.pop();
            }
            stats.lines += 1;

            if echo {
                if let Err(e) = echo_line(&mut output, &line) {
                    tracing::warn!(error = %e, "echo output failed, echo disabled");
                    echo = false;
                }
            }

            pending.extend_from_slice(&line);
            pending.push(b'\n');
            if pending.len() >= self.buffer_size {
                self.hand_over(&mut pending, &mut stats);
            }
        }

        if !pending.is_empty() {
            self.hand_over(&mut pending, &mut stats);
        }
        if let Err(e) = self.sink.flush() {
            tracing::warn!(error = %e, "sink flush failed at end of capture");
        }

        tracing::debug!(
            lines = stats.lines,
            bytes = stats.bytes,
            blocks = stats.blocks_written,
            failed = stats.failed_writes,
            "capture finished"
        );
        stats
    }

    fn hand_over(&self, pending: &mut Vec<u8>, stats: &mut CaptureStats) {
        stats.bytes += pending.len() as u64;
        match self.sink.write_block(pending) {
            Ok(()) => stats.blocks_written += 1,
            Err(e) => {
                stats.failed_writes += 1;
                tracing::error!(bytes = pending.len(), error = %e, "captured block not written");
            }
        }
        pending.clear();
    }
}

fn echo_line<W: Write>(output: &mut W, line: &[u8]) -> std::io::Result<()> {
    output.write_all(line)?;
    output.write_all(b"\n")?;
    output.flush()
}
