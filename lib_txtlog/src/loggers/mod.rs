/// Error type shared by the writer, retention and archive stages.
pub mod error;
/// Immutable log line values and the optional line formatter.
pub mod logline;
/// Bounded, thread-safe FIFO of recent log lines.
pub mod history;
/// File naming scheme for active, backup and archive files.
pub mod naming;
/// Compresses backups into zip archives and caps the archive count.
pub mod archiver;
/// Caps the number of plain text backups, archiving the oldest.
pub mod retention;
/// Size-triggered rotating text file writer.
pub mod txtlog;
/// Process-wide logging context: history, confidential masking and an optional writer.
pub mod context;
