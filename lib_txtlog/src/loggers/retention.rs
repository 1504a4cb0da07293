//! # Plain Backup Retention
//!
//! Keeps at most `max_txt_backups` uncompressed backups. Older ones are handed
//! to the [`Archiver`]; each backup is deleted only after its archive was
//! written completely. A backup that fails to archive stays on disk and is
//! picked up again by the next rotation.

use std::fs;
use std::path::{Path, PathBuf};

use super::archiver::Archiver;
use super::naming;

/// What one [`RetentionManager::enforce`] pass did.
#[derive(Debug, Default)]
pub struct RetentionReport {
    /// Archives created in this pass.
    pub archived: Vec<PathBuf>,
    /// Backups that could not be archived and were kept.
    pub failed: Vec<PathBuf>,
    /// Backups deleted after a successful archive.
    pub removed: Vec<PathBuf>,
}

/// # Retention Manager
///
/// Enforces the plain backup limit of one log family.
#[derive(Debug, Clone)]
pub struct RetentionManager {
    dir: PathBuf,
    base_name: String,
    max_txt_backups: usize,
    archiver: Archiver,
}

impl RetentionManager {
    /// Creates a manager for `<dir>/<base_name>_*.txt` that archives through `archiver`.
    pub fn new(
        dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        max_txt_backups: usize,
        archiver: Archiver,
    ) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            max_txt_backups,
            archiver,
        }
    }

    /// The archiver backups are handed to.
    pub fn archiver(&self) -> &Archiver {
        &self.archiver
    }

    /// Maximum number of plain backups kept.
    pub fn max_txt_backups(&self) -> usize {
        self.max_txt_backups
    }

    /// Backups currently on disk, oldest first.
    pub fn backups(&self) -> Vec<PathBuf> {
        naming::list_backups(&self.dir, &self.base_name)
    }

    /// Archives and deletes the oldest backups beyond the limit.
    pub fn enforce(&self) -> RetentionReport {
        let backups = self.backups();
        if backups.len() <= self.max_txt_backups {
            return RetentionReport::default();
        }

        let excess = backups.len() - self.max_txt_backups;
        let candidates = &backups[..excess];
        let archive_report = self.archiver.archive(candidates);

        let mut report = RetentionReport {
            failed: archive_report
                .failed
                .into_iter()
                .map(|(backup, _)| backup)
                .collect(),
            ..RetentionReport::default()
        };

        for (backup, archive) in archive_report.archived {
            report.archived.push(archive);
            if remove_backup(&backup) {
                report.removed.push(backup);
            }
        }

        tracing::debug!(
            archived = report.archived.len(),
            failed = report.failed.len(),
            removed = report.removed.len(),
            "plain backup retention applied"
        );
        report
    }
}

fn remove_backup(backup: &Path) -> bool {
    match fs::remove_file(backup) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(backup = %backup.display(), error = %e, "failed to remove archived backup");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn manager(dir: &Path, max_txt_backups: usize) -> RetentionManager {
        RetentionManager::new(dir, "log", max_txt_backups, Archiver::new(dir, "log", 10))
    }

    #[test]
    fn test_within_limit_is_noop() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("log_20240101.000000.txt"), b"a").unwrap();
        fs::write(dir.path().join("log_20240101.000001.txt"), b"b").unwrap();

        let report = manager(dir.path(), 2).enforce();
        assert!(report.archived.is_empty());
        assert_eq!(naming::list_backups(dir.path(), "log").len(), 2);
    }

    #[test]
    fn test_oldest_backups_are_archived_and_removed() {
        let dir = tempdir().unwrap();
        for second in 0..4 {
            let name = format!("log_20240101.00000{}.txt", second);
            fs::write(dir.path().join(name), format!("backup {}\n", second)).unwrap();
        }

        let report = manager(dir.path(), 1).enforce();
        assert_eq!(report.archived.len(), 3);
        assert_eq!(report.removed.len(), 3);
        assert!(report.failed.is_empty());

        let backups = naming::list_backups(dir.path(), "log");
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].file_name().unwrap(), "log_20240101.000003.txt");
        assert_eq!(naming::list_archives(dir.path(), "log").len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_archive_keeps_backup() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let unreadable = dir.path().join("log_20240101.000000.txt");
        fs::write(&unreadable, b"secret").unwrap();
        fs::write(dir.path().join("log_20240101.000001.txt"), b"newer").unwrap();
        fs::set_permissions(&unreadable, fs::Permissions::from_mode(0o000)).unwrap();

        // Running as root ignores file modes; nothing to assert then.
        if File::open(&unreadable).is_ok() {
            return;
        }

        let report = manager(dir.path(), 1).enforce();
        assert_eq!(report.failed, vec![unreadable.clone()]);
        assert!(unreadable.exists());
        assert!(naming::list_archives(dir.path(), "log").is_empty());
    }
}
