//! # Log Context
//!
//! Owns the [`HistoryBuffer`], the confidential strings to mask and an optional
//! shared [`TxtLog`]. One context is created at startup and handed to whatever
//! needs to record lines; there is no process-global state.
//!
//! Recorded lines only enter the history. They reach the attached writer when
//! [`LogContext::flush_history`] drains the history in one block, so each line
//! lands in the file exactly once.
//!
//! [`LogContext::make_writer`] plugs the history into a `tracing_subscriber::fmt`
//! layer, so formatted tracing events land in the buffer as well. That path only
//! feeds the history: the writer itself emits tracing events while rotating.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

use super::error::Result;
use super::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use super::logline::{format_line, LogLevel, LogLine};
use super::txtlog::TxtLog;

const MASK_CHAR: char = '*';

/// # Log Context
///
/// History, masking and an optional file sink behind one handle.
#[derive(Debug)]
pub struct LogContext {
    history: HistoryBuffer,
    writer: Option<Arc<TxtLog>>,
    confidential: Mutex<Vec<String>>,
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl LogContext {
    /// Creates a context whose history keeps `history_capacity` lines and has no file sink.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: HistoryBuffer::new(history_capacity),
            writer: None,
            confidential: Mutex::new(Vec::new()),
        }
    }

    /// Attaches the writer [`flush_history`](Self::flush_history) drains into.
    pub fn with_writer(mut self, writer: Arc<TxtLog>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// The buffer recorded lines are kept in.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// The writer [`flush_history`](Self::flush_history) drains into, if any.
    pub fn writer(&self) -> Option<&Arc<TxtLog>> {
        self.writer.as_ref()
    }

    fn secrets(&self) -> MutexGuard<'_, Vec<String>> {
        self.confidential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a string that is replaced by `*` in every line recorded afterwards.
    ///
    /// Empty strings are ignored.
    pub fn set_confidential(&self, secret: impl Into<String>) {
        let secret = secret.into();
        if secret.is_empty() {
            return;
        }
        let mut secrets = self.secrets();
        if !secrets.contains(&secret) {
            secrets.push(secret);
        }
    }

    /// Replaces every occurrence of a registered secret with the same number of `*`.
    pub fn mask(&self, text: &str) -> String {
        let secrets = self.secrets();
        secrets.iter().fold(text.to_string(), |acc, secret| {
            let stars: String = std::iter::repeat(MASK_CHAR)
                .take(secret.chars().count())
                .collect();
            acc.replace(secret.as_str(), &stars)
        })
    }

    /// Masks `line` and appends it to the history.
    pub fn record(&self, line: &str) {
        self.history.push(self.mask(line));
    }

    /// Formats and records one message; see [`format_line`].
    pub fn log(&self, level: LogLevel, function: &str, message: &str) {
        let line = format_line(level, function, message);
        self.record(&line.to_string());
    }

    /// Records an `[I]` line.
    pub fn info(&self, function: &str, message: &str) {
        self.log(LogLevel::Info, function, message)
    }

    /// Records a `[W]` line.
    pub fn warning(&self, function: &str, message: &str) {
        self.log(LogLevel::Warning, function, message)
    }

    /// Records an `[E]` line.
    pub fn error(&self, function: &str, message: &str) {
        self.log(LogLevel::Error, function, message)
    }

    /// Records a `[C]` line.
    pub fn critical(&self, function: &str, message: &str) {
        self.log(LogLevel::Critical, function, message)
    }

    /// All buffered lines concatenated, oldest first.
    pub fn history_text(&self) -> String {
        let mut text = String::new();
        self.history.for_each(|line| {
            text.push_str(&String::from_utf8_lossy(line.as_bytes()));
            true
        });
        text
    }

    /// Visits buffered lines oldest first until `visit` returns `false`.
    pub fn for_each_history<F>(&self, visit: F) -> usize
    where
        F: FnMut(&LogLine) -> bool,
    {
        self.history.for_each(visit)
    }

    /// Drains the history into the attached writer as one block.
    ///
    /// Returns the number of bytes written. Without a writer nothing is drained
    /// and `0` is returned. When the write fails the lines go back into the
    /// history ahead of anything recorded meanwhile, ready for the next flush.
    pub fn flush_history(&self) -> Result<usize> {
        let Some(writer) = self.writer.as_ref() else {
            return Ok(0);
        };
        let lines = self.history.take_all();
        let block: Vec<u8> = lines
            .iter()
            .flat_map(|line| line.as_bytes().iter().copied())
            .collect();
        if block.is_empty() {
            return Ok(0);
        }
        match writer.write(&block) {
            Ok(()) => Ok(block.len()),
            Err(e) => {
                tracing::warn!(lines = lines.len(), error = %e, "history flush failed, lines kept");
                self.history.restore(lines);
                Err(e)
            }
        }
    }

    /// A `MakeWriter` for `tracing_subscriber::fmt` that appends each formatted line to the history.
    pub fn make_writer(self: &Arc<Self>) -> HistoryMakeWriter {
        HistoryMakeWriter {
            context: Arc::clone(self),
        }
    }
}

/// Hands out [`HistoryWriter`]s bound to one [`LogContext`].
#[derive(Debug, Clone)]
pub struct HistoryMakeWriter {
    context: Arc<LogContext>,
}

impl<'a> MakeWriter<'a> for HistoryMakeWriter {
    type Writer = HistoryWriter;

    fn make_writer(&'a self) -> Self::Writer {
        HistoryWriter {
            context: Arc::clone(&self.context),
            pending: Vec::new(),
        }
    }
}

/// Writer for a single tracing event. Complete lines are pushed as they arrive;
/// a trailing partial line is pushed when the writer is dropped.
#[derive(Debug)]
pub struct HistoryWriter {
    context: Arc<LogContext>,
    pending: Vec<u8>,
}

impl HistoryWriter {
    fn push_pending_lines(&mut self) {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.push(&line);
        }
    }

    fn push(&self, bytes: &[u8]) {
        let masked = self.context.mask(&String::from_utf8_lossy(bytes));
        self.context.history.push(masked);
    }
}

impl Write for HistoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.push_pending_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for HistoryWriter {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.push(&rest);
        }
    }
}
