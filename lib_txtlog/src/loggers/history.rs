//! # History Buffer
//!
//! A bounded FIFO of the most recent log lines. Any call site may push into it
//! concurrently; a single mutex guards the deque, and every operation holds it
//! for O(1) work apart from the snapshot copies.
//!
//! A capacity of `0` disables buffering: pushes are dropped.

use super::logline::LogLine;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of retained lines.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug)]
struct HistoryState {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl HistoryState {
    fn evict_overflow(&mut self) {
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }
}

/// # History Buffer
///
/// Thread-safe ring of recent [`LogLine`]s. Insertion order is preserved and the
/// oldest entries are evicted first once `capacity` is exceeded.
#[derive(Debug)]
pub struct HistoryBuffer {
    state: Mutex<HistoryState>,
}

impl HistoryBuffer {
    /// Creates an empty buffer holding at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(HistoryState {
                lines: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
                capacity,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `line`, evicting the oldest entry when the buffer is full.
    pub fn push(&self, line: impl Into<LogLine>) {
        let mut state = self.lock();
        if state.capacity == 0 {
            return;
        }
        state.lines.push_back(line.into());
        state.evict_overflow();
    }

    /// Copies every buffered line, oldest first, leaving the buffer untouched.
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.lock().lines.iter().cloned().collect()
    }

    /// Removes and returns every buffered line, oldest first.
    ///
    /// Used before a bulk flush to disk so that the same lines are not written twice.
    pub fn take_all(&self) -> Vec<LogLine> {
        self.lock().lines.drain(..).collect()
    }

    /// Puts `lines` back in front of whatever was pushed since they were taken.
    ///
    /// Undoes a [`take_all`](Self::take_all) whose flush failed. When the result
    /// exceeds the capacity the oldest lines are evicted as usual.
    pub fn restore(&self, lines: Vec<LogLine>) {
        let mut state = self.lock();
        if state.capacity == 0 {
            return;
        }
        for line in lines.into_iter().rev() {
            state.lines.push_front(line);
        }
        state.evict_overflow();
    }

    /// Visits lines oldest first while holding the lock; stops when `visit` returns `false`.
    ///
    /// Returns the number of lines visited.
    pub fn for_each<F>(&self, mut visit: F) -> usize
    where
        F: FnMut(&LogLine) -> bool,
    {
        let state = self.lock();
        let mut visited = 0;
        for line in state.lines.iter() {
            visited += 1;
            if !visit(line) {
                break;
            }
        }
        visited
    }

    /// Changes the capacity. Shrinking evicts the oldest lines immediately.
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.lock();
        state.capacity = capacity;
        state.evict_overflow();
    }

    /// Current capacity.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Drops every buffered line.
    pub fn clear(&self) {
        self.lock().lines.clear();
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().lines.is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
