use lib_txtlog::{CaptureLoop, HistoryBuffer, LogContext, TxtLog, TxtLogConfig};
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use zip::ZipArchive;

fn unzip(path: &Path) -> Vec<u8> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_index(0).unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    content
}

fn payload(i: usize) -> String {
    format!("payload-{}\n", i)
}

#[test]
fn test_history_keeps_last_lines_in_order() {
    let history = HistoryBuffer::new(5);
    for i in 0..12 {
        history.push(format!("{}\n", i));
    }
    let kept: Vec<String> = history.snapshot().iter().map(|l| l.to_string()).collect();
    assert_eq!(kept, vec!["7\n", "8\n", "9\n", "10\n", "11\n"]);

    let disabled = HistoryBuffer::new(0);
    disabled.push("dropped\n");
    assert_eq!(disabled.len(), 0);
}

#[test]
fn test_sixty_plus_sixty_rotates_once() {
    let dir = tempdir().unwrap();
    let log = TxtLog::new(TxtLogConfig::new(dir.path(), "app").with_max_file_size(100)).unwrap();

    let first = vec![b'1'; 60];
    let second = vec![b'2'; 60];
    log.write(&first).unwrap();
    assert!(log.backups().is_empty());
    log.write(&second).unwrap();

    let backups = log.backups();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read(&backups[0]).unwrap(), first);
    assert_eq!(fs::read(log.active_path()).unwrap(), second);
}

#[test]
fn test_three_rotations_with_one_plain_backup() {
    let dir = tempdir().unwrap();
    let config = TxtLogConfig::new(dir.path(), "app")
        .with_max_file_size(10)
        .with_max_txt_backups(1)
        .with_max_archive_files(10);
    let log = TxtLog::new(config).unwrap();

    for i in 0..4 {
        log.write(payload(i)).unwrap();
    }

    let backups = log.backups();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), payload(2));

    let archives = log.archives();
    assert_eq!(archives.len(), 2);
    assert_eq!(unzip(&archives[0]), payload(0).into_bytes());
    assert_eq!(unzip(&archives[1]), payload(1).into_bytes());
    assert_eq!(fs::read_to_string(log.active_path()).unwrap(), payload(3));
}

#[test]
fn test_archive_limit_keeps_most_recent() {
    let dir = tempdir().unwrap();
    let config = TxtLogConfig::new(dir.path(), "app")
        .with_max_file_size(10)
        .with_max_txt_backups(0)
        .with_max_archive_files(2);
    let log = TxtLog::new(config).unwrap();

    // Six writes, five rotations, each backup archived right away.
    for i in 0..6 {
        log.write(payload(i)).unwrap();
        assert!(log.archives().len() <= 2);
    }

    assert!(log.backups().is_empty());
    let archives = log.archives();
    assert_eq!(archives.len(), 2);
    assert_eq!(unzip(&archives[0]), payload(3).into_bytes());
    assert_eq!(unzip(&archives[1]), payload(4).into_bytes());
}

#[test]
fn test_backup_count_never_exceeds_limit() {
    let dir = tempdir().unwrap();
    let config = TxtLogConfig::new(dir.path(), "app")
        .with_max_file_size(32)
        .with_max_txt_backups(2)
        .with_max_archive_files(1000);
    let log = TxtLog::new(config).unwrap();

    for i in 0..50 {
        log.write(format!("line {:04}\n", i)).unwrap();
        assert!(log.backups().len() <= 2);
    }
    assert!(!log.archives().is_empty());
}

#[test]
fn test_concurrent_writes_do_not_interleave() {
    let dir = tempdir().unwrap();
    let config = TxtLogConfig::new(dir.path(), "app")
        .with_max_file_size(512)
        .with_max_txt_backups(1000)
        .with_max_archive_files(1000);
    let log = Arc::new(TxtLog::new(config).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..200 {
                    log.write(format!("t{} i{:03} ........................\n", t, i))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut text = String::new();
    for backup in log.backups() {
        text.push_str(&fs::read_to_string(backup).unwrap());
    }
    text.push_str(&fs::read_to_string(log.active_path()).unwrap());

    assert_eq!(text.lines().count(), 800);
    assert!(text
        .lines()
        .all(|line| line.ends_with("........................")));
    for backup in log.backups() {
        assert!(fs::metadata(backup).unwrap().len() < 512);
    }
}

#[test]
fn test_capture_loop_feeds_rotating_log() {
    let dir = tempdir().unwrap();
    let config = TxtLogConfig::new(dir.path(), "capture")
        .with_max_file_size(64)
        .with_max_txt_backups(10);
    let log = TxtLog::new(config).unwrap();

    let input: String = (0..20).map(|i| format!("captured line {:02}\n", i)).collect();
    let mut echoed = Vec::new();
    let stats = CaptureLoop::new(&log, 32).run(Cursor::new(input.clone()), &mut echoed);

    assert_eq!(echoed, input.as_bytes());
    assert_eq!(stats.lines, 20);
    assert_eq!(stats.failed_writes, 0);
    assert!(!log.backups().is_empty());

    let mut stored = String::new();
    for backup in log.backups() {
        stored.push_str(&fs::read_to_string(backup).unwrap());
    }
    stored.push_str(&fs::read_to_string(log.active_path()).unwrap());
    assert_eq!(stored, input);
}

#[test]
fn test_context_flushes_history_into_log() {
    let dir = tempdir().unwrap();
    let log = Arc::new(TxtLog::new(TxtLogConfig::new(dir.path(), "ctx")).unwrap());
    let context = LogContext::new(100).with_writer(Arc::clone(&log));
    context.set_confidential("p@ss");

    context.warning("login", "user bob p@ss rejected");
    context.info("login", "retrying");
    let written = context.flush_history().unwrap();
    assert_eq!(context.flush_history().unwrap(), 0);

    let text = fs::read_to_string(log.active_path()).unwrap();
    assert_eq!(written, text.len());
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("[W]: login: user bob **** rejected\n"));
    assert!(text.contains("[I]: login: retrying\n"));
    assert!(!text.contains("p@ss"));
}
