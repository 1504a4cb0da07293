//! # lib_txtlog
//!
//! Capture-and-retention pipeline for plain text logs:
//!
//! - **`loggers`**: the size-rotated [`TxtLog`] writer, plain backup retention,
//!   zip archiving, the bounded [`HistoryBuffer`] and the [`LogContext`] that ties
//!   them together.
//! - **`configs`**: serde-backed configuration values with their defaults.
//! - **`ingestors`**: the line capture loop that tees a stream into a [`TxtLog`].

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod configs;
pub mod ingestors;
pub mod loggers;

// Re-export everything
pub use configs::config_txtlog::*;
pub use ingestors::line_capture::*;
pub use loggers::archiver::*;
pub use loggers::context::*;
pub use loggers::error::*;
pub use loggers::history::*;
pub use loggers::logline::*;
pub use loggers::retention::*;
pub use loggers::txtlog::*;
