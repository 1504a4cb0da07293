//! File naming for one log family inside a working directory:
//!
//! ```text
//! <dir>/<base>.txt                                  active file
//! <dir>/<base>_YYYYMMDD.HHMMSS[_NNN].txt            plain backups
//! <dir>/archive_<base>_YYYYMMDD.HHMMSS[_NNN].zip    archives
//! ```
//!
//! Retention relies on lexical order being chronological, so the timestamp is
//! fixed width and zero padded. A second rotation within the same second gets a
//! fixed-width `_NNN` suffix; `_` sorts after `.`, so suffixed names follow the
//! unsuffixed one.

use chrono::{DateTime, Local};
use glob::{glob, Pattern};
use regex::Regex;
use std::path::{Path, PathBuf};

use super::error::{Result, TxtLogError};

/// strftime layout of the backup timestamp.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";
/// Extension of the active file and plain backups.
pub const TEXT_EXTENSION: &str = "txt";
/// Extension of archive files.
pub const ARCHIVE_EXTENSION: &str = "zip";
/// Prefix prepended to a backup's stem to name its archive.
pub const ARCHIVE_PREFIX: &str = "archive_";

const MAX_SEQUENCE: u32 = 999;
const STAMP_PATTERN: &str = r"\d{8}\.\d{6}(?:_\d{3})?";

/// Path of the active log file: `<dir>/<base>.txt`.
pub fn active_path(dir: &Path, base: &str) -> PathBuf {
    dir.join(format!("{}.{}", base, TEXT_EXTENSION))
}

fn backup_file_name(base: &str, stamp: &str, sequence: u32) -> String {
    if sequence == 0 {
        format!("{}_{}.{}", base, stamp, TEXT_EXTENSION)
    } else {
        format!("{}_{}_{:03}.{}", base, stamp, sequence, TEXT_EXTENSION)
    }
}

/// Archive path derived from a backup: `<dir>/archive_<backup stem>.zip`.
pub fn archive_path_for(dir: &Path, backup: &Path) -> Result<PathBuf> {
    let stem = backup
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TxtLogError::InvalidFileName(backup.to_path_buf()))?;
    Ok(dir.join(format!("{}{}.{}", ARCHIVE_PREFIX, stem, ARCHIVE_EXTENSION)))
}

/// Picks the backup path for a rotation happening at `now`.
///
/// Within one second the sequence number moves past the highest one still
/// present as a backup or an archive, so a new file never sorts before an
/// older one even after the archive limit freed a lower number.
///
/// Returns `None` once every sequence number of that second is used; taking
/// one anyway would overwrite an existing backup.
pub fn next_backup_path(dir: &Path, base: &str, now: DateTime<Local>) -> Option<PathBuf> {
    let stamp = now.format(BACKUP_TIMESTAMP_FORMAT).to_string();
    let backup_prefix = format!("{}_{}", base, stamp);
    let archive_prefix = format!("{}{}", ARCHIVE_PREFIX, backup_prefix);

    let highest = list_backups(dir, base)
        .iter()
        .filter_map(|path| sequence_of(path, &backup_prefix))
        .chain(
            list_archives(dir, base)
                .iter()
                .filter_map(|path| sequence_of(path, &archive_prefix)),
        )
        .max();

    let sequence = match highest {
        None => 0,
        Some(s) if s < MAX_SEQUENCE => s + 1,
        Some(_) => return None,
    };
    Some(dir.join(backup_file_name(base, &stamp, sequence)))
}

fn sequence_of(path: &Path, stamped_prefix: &str) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix(stamped_prefix)?;
    if rest.is_empty() {
        return Some(0);
    }
    rest.strip_prefix('_')?.parse().ok()
}

fn list_matching(dir: &Path, glob_name: &str, name_re: &Regex) -> Vec<PathBuf> {
    let Some(dir_str) = dir.to_str() else {
        tracing::warn!(dir = %dir.display(), "working directory is not valid UTF-8, skipping listing");
        return Vec::new();
    };
    let pattern = format!("{}/{}", Pattern::escape(dir_str), glob_name);

    let entries = match glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(%pattern, error = %e, "invalid listing pattern");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name_re.is_match(name))
        })
        .collect();
    files.sort();
    files
}

/// Plain backups of `base` in `dir`, oldest first. An unreadable directory yields nothing.
pub fn list_backups(dir: &Path, base: &str) -> Vec<PathBuf> {
    let name_re = Regex::new(&format!(
        "^{}_{}\\.{}$",
        regex::escape(base),
        STAMP_PATTERN,
        TEXT_EXTENSION
    ));
    match name_re {
        Ok(re) => list_matching(
            dir,
            &format!("{}_*.{}", Pattern::escape(base), TEXT_EXTENSION),
            &re,
        ),
        Err(_) => Vec::new(),
    }
}

/// Archives of `base` in `dir`, oldest first. An unreadable directory yields nothing.
pub fn list_archives(dir: &Path, base: &str) -> Vec<PathBuf> {
    let name_re = Regex::new(&format!(
        "^{}{}_{}\\.{}$",
        ARCHIVE_PREFIX,
        regex::escape(base),
        STAMP_PATTERN,
        ARCHIVE_EXTENSION
    ));
    match name_re {
        Ok(re) => list_matching(
            dir,
            &format!(
                "{}{}_*.{}",
                ARCHIVE_PREFIX,
                Pattern::escape(base),
                ARCHIVE_EXTENSION
            ),
            &re,
        ),
        Err(_) => Vec::new(),
    }
}
