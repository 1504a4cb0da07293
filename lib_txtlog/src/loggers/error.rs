use std::path::PathBuf;
use thiserror::Error;

use crate::configs::config_txtlog::ConfigError;

/// Convenience alias used throughout the `loggers` module.
pub type Result<T, E = TxtLogError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
/// # TxtLog Error
///
/// Failures reported by the rotating writer and the archive pipeline. None of
/// them are fatal: the writer stays usable and the next call retries.
pub enum TxtLogError {
    /// The active log file could not be opened or created for appending.
    #[error("cannot open log file {path}: {source}")]
    Open {
        /// Path of the active file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Fewer bytes reached the file than were requested.
    #[error("short write: {written} of {requested} bytes")]
    ShortWrite {
        /// Bytes actually written before the failure.
        written: usize,
        /// Bytes the caller asked to write.
        requested: usize,
    },

    /// Any other I/O error.
    #[error("I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    /// The zip encoder rejected the input or could not finish the archive.
    #[error("archive error for {path}: {source}")]
    Archive {
        /// Backup file being archived.
        path: PathBuf,
        /// Error reported by the zip writer.
        source: zip::result::ZipError,
    },

    /// A backup path has no usable file name to derive an archive name from.
    #[error("invalid backup file name: {0}")]
    InvalidFileName(PathBuf),

    /// The writer configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
