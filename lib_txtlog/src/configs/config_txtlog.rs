use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Default rotation threshold: 20 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;
/// Default number of plain text backups kept.
pub const DEFAULT_MAX_TXT_BACKUPS: usize = 3;
/// Default number of archives kept.
pub const DEFAULT_MAX_ARCHIVE_FILES: usize = 10;
/// Default capture accumulation threshold in bytes.
pub const DEFAULT_CAPTURE_BUFFER_SIZE: usize = 1024;
/// Default base file name (the active file is `<base>.txt`).
pub const DEFAULT_BASE_NAME: &str = "log";

/// Errors raised while validating a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The base file name is empty.
    #[error("base file name must not be empty")]
    EmptyBaseName,

    /// The base file name would place files outside the working directory.
    #[error("base file name must not contain path separators: {0}")]
    BaseNameHasSeparator(String),
}

/// # TxtLog Configuration
///
/// Everything a [`TxtLog`](crate::TxtLog) needs at construction. Only
/// `max_file_size` can change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TxtLogConfig {
    /// Directory holding the active file, backups and archives.
    pub working_dir: PathBuf,
    /// Base name of the log family, without extension.
    pub base_name: String,
    /// Rotation threshold in bytes.
    pub max_file_size: u64,
    /// Plain text backups kept before archiving.
    pub max_txt_backups: usize,
    /// Archives kept before the oldest are deleted.
    pub max_archive_files: usize,
}

impl Default for TxtLogConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            base_name: DEFAULT_BASE_NAME.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_txt_backups: DEFAULT_MAX_TXT_BACKUPS,
            max_archive_files: DEFAULT_MAX_ARCHIVE_FILES,
        }
    }
}

impl TxtLogConfig {
    /// Builds a configuration for `<working_dir>/<base_name>.txt` with default limits.
    pub fn new(working_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            base_name: base_name.into(),
            ..Self::default()
        }
    }

    /// Sets the rotation threshold.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Sets the number of plain backups kept.
    pub fn with_max_txt_backups(mut self, max_txt_backups: usize) -> Self {
        self.max_txt_backups = max_txt_backups;
        self
    }

    /// Sets the number of archives kept.
    pub fn with_max_archive_files(mut self, max_archive_files: usize) -> Self {
        self.max_archive_files = max_archive_files;
        self
    }

    /// Checks that the base name is usable as a file name prefix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_name.is_empty() {
            return Err(ConfigError::EmptyBaseName);
        }
        if self.base_name.contains(['/', '\\']) {
            return Err(ConfigError::BaseNameHasSeparator(self.base_name.clone()));
        }
        Ok(())
    }
}

/// # Capture Configuration
///
/// Writer configuration plus the capture loop's accumulation threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Configuration of the writer the capture loop feeds.
    #[serde(flatten)]
    pub log: TxtLogConfig,
    /// Accumulated bytes that trigger a write to the log file.
    pub buffer_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            log: TxtLogConfig::default(),
            buffer_size: DEFAULT_CAPTURE_BUFFER_SIZE,
        }
    }
}

impl fmt::Display for CaptureConfig {
    /// Multi-line summary printed by the capture tool before it starts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==== Logger Configuration ====")?;
        writeln!(f, "Working directory   : {}", self.log.working_dir.display())?;
        writeln!(f, "Base file name      : {}", self.log.base_name)?;
        writeln!(f, "Max file size       : {} bytes", self.log.max_file_size)?;
        writeln!(f, "Max .txt backups    : {}", self.log.max_txt_backups)?;
        writeln!(f, "Max archive files   : {}", self.log.max_archive_files)?;
        writeln!(f, "Buffering           : {} bytes", self.buffer_size)?;
        write!(f, "===============================")
    }
}
