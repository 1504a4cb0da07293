//! # `txt-logger`: Tee Standard Input Into a Rotating Log
//!
//! Sits in a pipe, passes every line from standard input through to standard
//! output unchanged, and appends the same lines to `<workdir>/<filename>.txt`.
//! The log file is rotated by size into timestamped `.txt` backups; old backups
//! are compressed into `archive_*.zip` files and the oldest archives are deleted.
//!
//! ## Usage
//!
//! ```bash
//! my-service 2>&1 | txt-logger --workdir=/var/log/my-service --filename=service \
//!     --max-size=1048576 --max-txt-backups=3 --max-archive-files=10 --buffer=1024
//! ```
//!
//! Settings are resolved from built-in defaults, an optional JSON file
//! (`--config=path`), `TXTLOG_*` environment variables and command line flags,
//! later sources winning. The resolved configuration and all diagnostics go to
//! standard error so standard output stays a pure pass-through.
//!
//! The tool exits with `0` when the input ends. Only setup errors (an
//! unreadable config file, an invalid file name) produce a non-zero status.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use lib_txtlog::{CaptureLoop, TxtLog};
use std::io;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use config::{load_config, Config, DEFAULT_LOG_LEVEL};

/// Installs the stderr subscriber. The returned guard flushes pending
/// diagnostics when dropped and must live until the end of `main`.
fn init_tracing(filter: &str) -> WorkerGuard {
    let (writer, guard) = non_blocking(io::stderr());

    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();

    guard
}

fn main() -> Result<()> {
    let config = load_config(Config::parse())?;
    let _guard = init_tracing(&config.log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()));

    let capture = config.to_capture_config();
    eprintln!("{}", capture.to_string().cyan());

    let log = TxtLog::new(capture.log.clone()).context("invalid log file configuration")?;
    tracing::info!(path = %log.active_path().display(), "capturing standard input");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stats = CaptureLoop::new(&log, capture.buffer_size).run(stdin.lock(), stdout.lock());

    log.close();
    tracing::info!(
        lines = stats.lines,
        bytes = stats.bytes,
        blocks = stats.blocks_written,
        failed = stats.failed_writes,
        "input ended"
    );
    Ok(())
}
