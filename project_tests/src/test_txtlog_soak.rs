use anyhow::{ensure, Context, Result};
use clap::Parser;
use lib_txtlog::{TxtLog, TxtLogConfig};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use zip::ZipArchive;

#[derive(Parser, Debug)]
#[command(
    name = "test_txtlog_soak",
    about = "Hammers one TxtLog from several threads and checks the files it leaves behind"
)]
struct Args {
    /// Writer threads.
    #[arg(long, default_value_t = 8)]
    threads: usize,

    /// Lines written by each thread.
    #[arg(long, default_value_t = 2000)]
    lines: usize,

    /// Rotation threshold in bytes.
    #[arg(long, default_value_t = 4096)]
    max_size: u64,

    /// Plain backups kept.
    #[arg(long, default_value_t = 3)]
    max_txt_backups: usize,

    /// Archives kept. Use a large value to verify that no line is lost.
    #[arg(long, default_value_t = 100_000)]
    max_archive_files: usize,
}

fn read_archive(path: &Path) -> Result<String> {
    let mut archive = ZipArchive::new(File::open(path)?)
        .with_context(|| format!("corrupt archive {}", path.display()))?;
    let mut entry = archive.by_index(0)?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}

fn collect_text(log: &TxtLog) -> Result<String> {
    let mut text = String::new();
    for archive in log.archives() {
        text.push_str(&read_archive(&archive)?);
    }
    let backups: Vec<PathBuf> = log.backups();
    for backup in backups {
        text.push_str(&fs::read_to_string(&backup)?);
    }
    text.push_str(&fs::read_to_string(log.active_path())?);
    Ok(text)
}

/// # TxtLog Soak Runner
///
/// Spawns `--threads` writers that each append `--lines` tagged lines, then
/// reassembles archives, backups and the active file and checks that every
/// line appears exactly once and intact.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter("warn")
        .init();

    let args = Args::parse();
    let dir = tempdir()?;
    let config = TxtLogConfig::new(dir.path(), "soak")
        .with_max_file_size(args.max_size)
        .with_max_txt_backups(args.max_txt_backups)
        .with_max_archive_files(args.max_archive_files);
    let log = Arc::new(TxtLog::new(config)?);

    let handles: Vec<_> = (0..args.threads)
        .map(|t| {
            let log = Arc::clone(&log);
            let lines = args.lines;
            thread::spawn(move || -> Result<()> {
                for i in 0..lines {
                    log.write(format!("thread={:03} line={:06} payload=abcdefghij\n", t, i))?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
    }
    log.flush()?;

    let text = collect_text(&log)?;
    let total = text.lines().count();
    ensure!(
        total == args.threads * args.lines,
        "expected {} lines, found {}",
        args.threads * args.lines,
        total
    );
    ensure!(
        text.lines().all(|l| l.ends_with("payload=abcdefghij")),
        "found an interleaved line"
    );
    ensure!(
        log.backups().len() <= args.max_txt_backups,
        "too many plain backups"
    );

    println!(
        "ok: {} lines, {} backups, {} archives",
        total,
        log.backups().len(),
        log.archives().len()
    );
    Ok(())
}
