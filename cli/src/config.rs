use anyhow::{Context, Result};
use clap::Parser;
use lib_txtlog::{
    CaptureConfig, TxtLogConfig, DEFAULT_BASE_NAME, DEFAULT_CAPTURE_BUFFER_SIZE,
    DEFAULT_MAX_ARCHIVE_FILES, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_TXT_BACKUPS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Working directory used when no source sets one.
pub const DEFAULT_WORKDIR: &str = "/var/log";
/// Diagnostic filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[clap(
    name = "txt-logger",
    about = "Tees standard input to standard output and a size-rotated log file",
    version
)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "TXTLOG_WORKDIR", help = "Directory for the log file, backups and archives.")]
    pub workdir: Option<PathBuf>,

    #[clap(long, env = "TXTLOG_FILENAME", help = "Base file name; the active file is <filename>.txt.")]
    pub filename: Option<String>,

    #[clap(long = "max-size", env = "TXTLOG_MAX_SIZE", help = "Rotation threshold in bytes.")]
    pub max_size: Option<u64>,

    #[clap(long, env = "TXTLOG_MAX_TXT_BACKUPS", help = "Plain .txt backups kept before archiving.")]
    pub max_txt_backups: Option<usize>,

    #[clap(long, env = "TXTLOG_MAX_ARCHIVE_FILES", help = "Zip archives kept before the oldest are deleted.")]
    pub max_archive_files: Option<usize>,

    #[clap(long, env = "TXTLOG_BUFFER", help = "Bytes accumulated before a block is written.")]
    pub buffer: Option<usize>,

    #[clap(long, env = "TXTLOG_CONFIG", help = "Path to a JSON configuration file.")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    #[clap(long, env = "TXTLOG_LOG_LEVEL", help = "Diagnostic filter for stderr (error, warn, info, debug, trace).")]
    pub log_level: Option<String>,
}

impl Config {
    // 'other' wins wherever it has a value
    fn merge(self, other: Config) -> Config {
        Config {
            workdir: other.workdir.or(self.workdir),
            filename: other.filename.or(self.filename),
            max_size: other.max_size.or(self.max_size),
            max_txt_backups: other.max_txt_backups.or(self.max_txt_backups),
            max_archive_files: other.max_archive_files.or(self.max_archive_files),
            buffer: other.buffer.or(self.buffer),
            config: other.config.or(self.config),
            log_level: other.log_level.or(self.log_level),
        }
    }

    fn defaults() -> Config {
        Config {
            workdir: Some(PathBuf::from(DEFAULT_WORKDIR)),
            filename: Some(DEFAULT_BASE_NAME.to_string()),
            max_size: Some(DEFAULT_MAX_FILE_SIZE),
            max_txt_backups: Some(DEFAULT_MAX_TXT_BACKUPS),
            max_archive_files: Some(DEFAULT_MAX_ARCHIVE_FILES),
            buffer: Some(DEFAULT_CAPTURE_BUFFER_SIZE),
            config: None,
            log_level: None,
        }
    }

    /// Diagnostic filter directive: `--log-level` first, then `rust_log`, then [`DEFAULT_LOG_LEVEL`].
    pub fn log_filter(&self, rust_log: Option<String>) -> String {
        self.log_level
            .clone()
            .or(rust_log)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }

    /// Converts a fully merged configuration into the library's view.
    pub fn to_capture_config(&self) -> CaptureConfig {
        let fallback = CaptureConfig::default();
        CaptureConfig {
            log: TxtLogConfig {
                working_dir: self
                    .workdir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKDIR)),
                base_name: self
                    .filename
                    .clone()
                    .unwrap_or(fallback.log.base_name),
                max_file_size: self.max_size.unwrap_or(fallback.log.max_file_size),
                max_txt_backups: self.max_txt_backups.unwrap_or(fallback.log.max_txt_backups),
                max_archive_files: self
                    .max_archive_files
                    .unwrap_or(fallback.log.max_archive_files),
            },
            buffer_size: self.buffer.unwrap_or(fallback.buffer_size),
        }
    }
}

fn read_config_file(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Resolves the configuration: defaults, then the JSON file named by
/// `--config`, then environment variables and command line flags.
pub fn load_config(cli: Config) -> Result<Config> {
    let mut current = Config::defaults();

    if let Some(path) = cli.config.as_deref() {
        current = current.merge(read_config_file(path)?);
    }

    Ok(current.merge(cli))
}
