//! # Rotating Text Log Writer
//!
//! [`TxtLog`] appends raw text to `<dir>/<base>.txt`. Before every write it
//! checks whether the active file plus the incoming data would reach
//! `max_file_size`; if so the file is rotated first:
//!
//! 1. the active file is closed,
//! 2. renamed to `<base>_YYYYMMDD.HHMMSS.txt` (local time),
//! 3. the plain backup limit is enforced, archiving the oldest backups,
//! 4. the archive limit is enforced, deleting the oldest archives,
//! 5. the active path is reopened (created empty).
//!
//! Rotation is best effort. A failed rename, or a second whose backup names
//! are all taken, is logged and the writer keeps
//! appending to the same file until a later rotation succeeds. A failed open is
//! reported to the caller and retried on the next call.
//!
//! All operations on one instance are serialized by a single mutex, so a
//! `TxtLog` can be shared between threads behind an `Arc`. Writes never
//! interleave with each other or with a rotation.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::archiver::Archiver;
use super::error::{Result, TxtLogError};
use super::naming;
use super::retention::{RetentionManager, RetentionReport};
use crate::configs::config_txtlog::TxtLogConfig;

#[derive(Debug)]
struct TxtLogState {
    file: Option<File>,
    max_file_size: u64,
}

/// # TxtLog
///
/// Size-rotated append-only text log with plain backups and zip archives.
#[derive(Debug)]
pub struct TxtLog {
    working_dir: PathBuf,
    base_name: String,
    active_path: PathBuf,
    retention: RetentionManager,
    state: Mutex<TxtLogState>,
}

impl TxtLog {
    /// Creates the writer and opens (or creates) the active file.
    ///
    /// The working directory is created if missing. Failing to open the active
    /// file is logged but not returned: the first [`write`](Self::write) retries
    /// and reports the error. A file already at or over the limit from a
    /// previous run is rotated right away.
    pub fn new(config: TxtLogConfig) -> Result<Self> {
        config.validate()?;

        if let Err(e) = fs::create_dir_all(&config.working_dir) {
            tracing::warn!(
                dir = %config.working_dir.display(),
                error = %e,
                "cannot create log directory"
            );
        }

        let archiver = Archiver::new(
            &config.working_dir,
            &config.base_name,
            config.max_archive_files,
        );
        let retention = RetentionManager::new(
            &config.working_dir,
            &config.base_name,
            config.max_txt_backups,
            archiver,
        );

        let log = Self {
            active_path: naming::active_path(&config.working_dir, &config.base_name),
            working_dir: config.working_dir,
            base_name: config.base_name,
            retention,
            state: Mutex::new(TxtLogState {
                file: None,
                max_file_size: config.max_file_size,
            }),
        };

        {
            let mut state = log.lock();
            if let Ok(file) = log.open_active() {
                state.file = Some(file);
                if log.rotation_required(&state, 0) {
                    log.rotate(&mut state);
                }
            }
        }

        Ok(log)
    }

    fn lock(&self) -> MutexGuard<'_, TxtLogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `data` to the active file, rotating first when the threshold would be reached.
    ///
    /// Fails when the active file cannot be opened or when fewer bytes than
    /// requested were written; an already written prefix stays in the file.
    /// Empty `data` still opens the file and runs the rotation check.
    pub fn write(&self, data: impl AsRef<[u8]>) -> Result<()> {
        let data = data.as_ref();
        let mut state = self.lock();

        self.ensure_open(&mut state.file)?;
        if self.rotation_required(&state, data.len() as u64) {
            self.rotate(&mut state);
        }

        if data.is_empty() {
            return Ok(());
        }

        let file = self.ensure_open(&mut state.file)?;
        write_fully(file, data).inspect_err(|e| {
            tracing::error!(path = %self.active_path.display(), error = %e, "log write failed");
        })
    }

    /// Syncs the active file to storage. Does nothing when the file is closed.
    pub fn flush(&self) -> Result<()> {
        let state = self.lock();
        if let Some(file) = state.file.as_ref() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Closes the active file. Calling it again is harmless; a later write reopens the file.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.file.take().is_some() {
            tracing::debug!(path = %self.active_path.display(), "log file closed");
        }
    }

    /// True while the active file handle is open.
    pub fn is_open(&self) -> bool {
        self.lock().file.is_some()
    }

    /// Changes the rotation threshold; applies from the next write.
    pub fn set_max_file_size(&self, max_file_size: u64) {
        self.lock().max_file_size = max_file_size;
    }

    /// Current rotation threshold in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.lock().max_file_size
    }

    /// Path of the active file.
    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    /// Directory holding the log family.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Base name of the log family.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Plain backups on disk, oldest first.
    pub fn backups(&self) -> Vec<PathBuf> {
        naming::list_backups(&self.working_dir, &self.base_name)
    }

    /// Archives on disk, oldest first.
    pub fn archives(&self) -> Vec<PathBuf> {
        naming::list_archives(&self.working_dir, &self.base_name)
    }

    fn open_active(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.active_path)
            .map_err(|source| {
                tracing::error!(path = %self.active_path.display(), error = %source, "cannot open log file");
                TxtLogError::Open {
                    path: self.active_path.clone(),
                    source,
                }
            })
    }

    fn ensure_open<'a>(&self, slot: &'a mut Option<File>) -> Result<&'a mut File> {
        let file = match slot.take() {
            Some(file) => file,
            None => self.open_active()?,
        };
        Ok(slot.insert(file))
    }

    fn current_file_size(&self) -> u64 {
        fs::metadata(&self.active_path)
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    /// An empty active file is never rotated, so a single write larger than the
    /// threshold lands in a fresh file instead of producing empty backups.
    fn rotation_required(&self, state: &TxtLogState, incoming: u64) -> bool {
        let current = self.current_file_size();
        current > 0 && current.saturating_add(incoming) >= state.max_file_size
    }

    fn rotate(&self, state: &mut TxtLogState) {
        if let Some(file) = state.file.take() {
            if let Err(e) = file.sync_all() {
                tracing::warn!(path = %self.active_path.display(), error = %e, "sync before rotation failed");
            }
        }

        match naming::next_backup_path(&self.working_dir, &self.base_name, Local::now()) {
            Some(backup) => match fs::rename(&self.active_path, &backup) {
                Ok(()) => tracing::info!(backup = %backup.display(), "log file rotated"),
                Err(e) => tracing::error!(
                    path = %self.active_path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "log rotation failed, continuing with current file"
                ),
            },
            None => tracing::error!(
                path = %self.active_path.display(),
                "no backup name left for this second, continuing with current file"
            ),
        }

        let report: RetentionReport = self.retention.enforce();
        if !report.failed.is_empty() {
            tracing::warn!(
                failed = report.failed.len(),
                "some backups were not archived and will be retried"
            );
        }
        self.retention.archiver().enforce_archive_limit();

        // A failed reopen is logged by open_active and retried by the next write.
        state.file = self.open_active().ok();
    }
}

fn write_fully(file: &mut File, data: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < data.len() {
        match file.write(&data[written..]) {
            Ok(0) => {
                return Err(TxtLogError::ShortWrite {
                    written,
                    requested: data.len(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if written == 0 => return Err(e.into()),
            Err(_) => {
                return Err(TxtLogError::ShortWrite {
                    written,
                    requested: data.len(),
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(dir: &Path, max_file_size: u64) -> TxtLogConfig {
        TxtLogConfig::new(dir, "log")
            .with_max_file_size(max_file_size)
            .with_max_txt_backups(3)
            .with_max_archive_files(10)
    }

    #[test]
    fn test_creates_active_file_at_construction() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 100)).unwrap();
        assert!(log.is_open());
        assert_eq!(log.active_path(), dir.path().join("log.txt"));
        assert!(log.active_path().exists());
    }

    #[test]
    fn test_small_writes_do_not_rotate() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 100)).unwrap();
        for _ in 0..9 {
            log.write("0123456789").unwrap();
        }
        assert!(log.backups().is_empty());
        assert_eq!(fs::read(log.active_path()).unwrap().len(), 90);
    }

    #[test]
    fn test_write_reaching_limit_rotates_first() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 100)).unwrap();
        let first = "a".repeat(60);
        let second = "b".repeat(60);

        log.write(&first).unwrap();
        log.write(&second).unwrap();

        let backups = log.backups();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), first);
        assert_eq!(fs::read_to_string(log.active_path()).unwrap(), second);
    }

    #[test]
    fn test_exact_limit_triggers_rotation() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 100)).unwrap();
        log.write("x".repeat(50)).unwrap();
        log.write("y".repeat(50)).unwrap();
        assert_eq!(log.backups().len(), 1);
        assert_eq!(fs::read(log.active_path()).unwrap().len(), 50);
    }

    #[test]
    fn test_oversized_write_into_empty_file_does_not_rotate() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 10)).unwrap();
        log.write("z".repeat(25)).unwrap();
        assert!(log.backups().is_empty());

        // The next write sees a full file and rotates exactly once.
        log.write("q").unwrap();
        assert_eq!(log.backups().len(), 1);
        assert_eq!(fs::read_to_string(log.active_path()).unwrap(), "q");
    }

    #[test]
    fn test_existing_oversized_file_rotates_at_startup() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("log.txt"), "old".repeat(50)).unwrap();

        let log = TxtLog::new(config(dir.path(), 100)).unwrap();
        assert_eq!(log.backups().len(), 1);
        assert_eq!(fs::read(log.active_path()).unwrap().len(), 0);
    }

    #[test]
    fn test_close_is_idempotent_and_write_reopens() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 1000)).unwrap();
        log.write("before\n").unwrap();
        log.close();
        log.close();
        assert!(!log.is_open());

        log.write("after\n").unwrap();
        assert!(log.is_open());
        assert_eq!(
            fs::read_to_string(log.active_path()).unwrap(),
            "before\nafter\n"
        );
    }

    #[test]
    fn test_flush_when_closed_is_noop() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 1000)).unwrap();
        log.write("data").unwrap();
        log.flush().unwrap();
        log.close();
        log.flush().unwrap();
    }

    #[test]
    fn test_max_file_size_is_mutable() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 1000)).unwrap();
        assert_eq!(log.max_file_size(), 1000);

        log.write("x".repeat(20)).unwrap();
        log.set_max_file_size(30);
        assert_eq!(log.max_file_size(), 30);
        log.write("y".repeat(20)).unwrap();
        assert_eq!(log.backups().len(), 1);
    }

    #[test]
    fn test_open_failure_is_reported_and_retried() {
        let dir = tempdir().unwrap();
        let workdir = dir.path().join("logs");
        let log = TxtLog::new(config(&workdir, 1000)).unwrap();
        log.close();

        fs::remove_dir_all(&workdir).unwrap();
        assert!(matches!(log.write("lost"), Err(TxtLogError::Open { .. })));
        assert!(!log.is_open());

        fs::create_dir_all(&workdir).unwrap();
        log.write("kept").unwrap();
        assert_eq!(fs::read_to_string(log.active_path()).unwrap(), "kept");
    }

    #[test]
    fn test_exhausted_backup_names_skip_rotation() {
        let dir = tempdir().unwrap();
        let log = TxtLog::new(config(dir.path(), 10)).unwrap();
        log.write("0123456789").unwrap();

        // Block the last sequence number of the next few seconds.
        let now = Local::now();
        for offset in 0..3 {
            let stamp = (now + chrono::Duration::seconds(offset))
                .format(naming::BACKUP_TIMESTAMP_FORMAT)
                .to_string();
            fs::write(dir.path().join(format!("log_{}_999.txt", stamp)), "kept").unwrap();
        }
        let blocked = log.backups();

        log.write("abc").unwrap();
        assert_eq!(log.backups(), blocked);
        for backup in &blocked {
            assert_eq!(fs::read_to_string(backup).unwrap(), "kept");
        }
        assert_eq!(
            fs::read_to_string(log.active_path()).unwrap(),
            "0123456789abc"
        );
    }

    #[test]
    fn test_invalid_base_name_is_rejected() {
        let dir = tempdir().unwrap();
        let result = TxtLog::new(TxtLogConfig::new(dir.path(), "a/b"));
        assert!(matches!(result, Err(TxtLogError::Config(_))));
    }
}
