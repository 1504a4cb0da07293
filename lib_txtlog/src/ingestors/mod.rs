//! # Ingestors Module
//!
//! Front door for text entering the pipeline. Each submodule reads from one
//! kind of source and hands batches to a [`LogSink`](line_capture::LogSink).
//!
//! ## Contained Modules:
//! - **`line_capture`**: a blocking line tee that echoes a stream to an output
//!   while accumulating it into size-bounded blocks for a [`TxtLog`](crate::TxtLog).

/// Line-oriented tee from a reader to an echo output and a log sink.
pub mod line_capture;

pub use line_capture::{CaptureLoop, CaptureStats, LogSink};
