//! # Archiver
//!
//! Turns plain backups into single-entry zip archives and caps how many archives
//! a log family keeps.
//!
//! Each backup is streamed through the encoder in fixed-size chunks, so memory
//! use does not depend on the backup size. The entry is DEFLATE-compressed at a
//! fixed level and protected by the CRC-32 the zip container records for every
//! entry; a corrupted archive fails on extraction.
//!
//! The archiver never deletes backups. It reports which ones were archived and
//! leaves the deletion to [`RetentionManager`](crate::RetentionManager).

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::{Result, TxtLogError};
use super::naming;

/// Bytes read from a backup per encoder step.
pub const ARCHIVE_CHUNK_SIZE: usize = 4096;
/// DEFLATE level used for every archive.
pub const ARCHIVE_COMPRESSION_LEVEL: i64 = 6;
/// Entries at least this large are written with zip64 extensions.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Outcome of archiving a batch of backups.
#[derive(Debug, Default)]
pub struct ArchiveReport {
    /// `(backup, archive)` pairs that were written completely.
    pub archived: Vec<(PathBuf, PathBuf)>,
    /// Backups that could not be archived, with the reason.
    pub failed: Vec<(PathBuf, TxtLogError)>,
}

impl ArchiveReport {
    /// True when every input was archived.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// # Archiver
///
/// Compresses backups of one log family (`<dir>/<base>_*.txt`) into
/// `<dir>/archive_<base>_*.zip` and enforces the archive count.
#[derive(Debug, Clone)]
pub struct Archiver {
    dir: PathBuf,
    base_name: String,
    max_archive_files: usize,
}

impl Archiver {
    /// Creates an archiver for `<dir>/<base_name>` keeping at most `max_archive_files` archives.
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>, max_archive_files: usize) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            max_archive_files,
        }
    }

    /// Maximum number of archives kept by [`enforce_archive_limit`](Self::enforce_archive_limit).
    pub fn max_archive_files(&self) -> usize {
        self.max_archive_files
    }

    /// Archives each backup independently; one failure does not stop the others.
    pub fn archive(&self, backups: &[PathBuf]) -> ArchiveReport {
        let mut report = ArchiveReport::default();
        for backup in backups {
            match self.archive_file(backup) {
                Ok(archive) => {
                    tracing::info!(
                        backup = %backup.display(),
                        archive = %archive.display(),
                        "backup archived"
                    );
                    report.archived.push((backup.clone(), archive));
                }
                Err(e) => {
                    tracing::warn!(backup = %backup.display(), error = %e, "failed to archive backup");
                    report.failed.push((backup.clone(), e));
                }
            }
        }
        report
    }

    /// Compresses one backup and returns the archive path.
    ///
    /// On failure any partially written archive is removed, so a later retry starts clean.
    pub fn archive_file(&self, backup: &Path) -> Result<PathBuf> {
        let archive = naming::archive_path_for(&self.dir, backup)?;
        match compress_into(backup, &archive) {
            Ok(()) => Ok(archive),
            Err(e) => {
                if archive.exists() {
                    if let Err(remove_err) = fs::remove_file(&archive) {
                        tracing::warn!(
                            archive = %archive.display(),
                            error = %remove_err,
                            "failed to remove partial archive"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Deletes the oldest archives beyond the configured maximum and returns what was removed.
    pub fn enforce_archive_limit(&self) -> Vec<PathBuf> {
        let archives = naming::list_archives(&self.dir, &self.base_name);
        if archives.len() <= self.max_archive_files {
            return Vec::new();
        }

        let excess = archives.len() - self.max_archive_files;
        let mut removed = Vec::with_capacity(excess);
        for archive in archives.into_iter().take(excess) {
            match fs::remove_file(&archive) {
                Ok(()) => {
                    tracing::info!(archive = %archive.display(), "old archive removed");
                    removed.push(archive);
                }
                Err(e) => {
                    tracing::warn!(archive = %archive.display(), error = %e, "failed to remove old archive");
                }
            }
        }
        removed
    }
}

fn compress_into(backup: &Path, archive: &Path) -> Result<()> {
    let zip_err = |source| TxtLogError::Archive {
        path: backup.to_path_buf(),
        source,
    };

    let entry_name = backup
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| TxtLogError::InvalidFileName(backup.to_path_buf()))?;

    let mut input = File::open(backup)?;
    let input_len = input.metadata()?.len();

    let mut zip = ZipWriter::new(File::create(archive)?);
    let options = FileOptions::<'_, ()>::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL))
        .large_file(input_len >= ZIP64_THRESHOLD);
    zip.start_file(entry_name, options).map_err(zip_err)?;

    let mut chunk = [0u8; ARCHIVE_CHUNK_SIZE];
    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        zip.write_all(&chunk[..read])?;
    }

    let output = zip.finish().map_err(zip_err)?;
    output.sync_all()?;
    Ok(())
}
