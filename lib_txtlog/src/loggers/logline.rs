use bytes::Bytes;
use chrono::Local;
use std::fmt;

/// # Log Line
///
/// An already formatted log record, usually newline terminated. The pipeline
/// never parses it; it is stored, copied and written as opaque bytes. Cloning
/// is cheap because the bytes are reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LogLine(Bytes);

impl LogLine {
    /// Wraps raw bytes without copying them.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes of the line.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the line in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length line.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for LogLine {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<String> for LogLine {
    fn from(value: String) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<&str> for LogLine {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<Vec<u8>> for LogLine {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<&[u8]> for LogLine {
    fn from(value: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(value))
    }
}

impl fmt::Display for LogLine {
    /// Lossy UTF-8 rendering, for display only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// # Log Level
///
/// Severity tag used by [`format_line`]. Each level renders as one letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Normal progress information.
    Info,
    /// Something unusual that does not stop the operation.
    Warning,
    /// An operation failed.
    Error,
    /// The process is unlikely to continue correctly.
    Critical,
}

impl LogLevel {
    /// Single-letter tag: `I`, `W`, `E` or `C`.
    pub fn as_char(self) -> char {
        match self {
            LogLevel::Info => 'I',
            LogLevel::Warning => 'W',
            LogLevel::Error => 'E',
            LogLevel::Critical => 'C',
        }
    }
}

/// Formats a message as `[yymmdd_HHMMSS.mmm] [L]: function: message`.
///
/// Local time with millisecond resolution. A trailing newline is added when the
/// message does not already end with one, so the result can go straight into a
/// [`HistoryBuffer`](crate::HistoryBuffer) or a [`TxtLog`](crate::TxtLog).
pub fn format_line(level: LogLevel, function: &str, message: &str) -> LogLine {
    let ts = Local::now().format("%y%m%d_%H%M%S%.3f");
    let mut line = if function.is_empty() {
        format!("[{}] [{}]: {}", ts, level.as_char(), message)
    } else {
        format!("[{}] [{}]: {}: {}", ts, level.as_char(), function, message)
    };
    if !line.ends_with('\n') {
        line.push('\n');
    }
    LogLine::from(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_format_line_layout() {
        let line = format_line(LogLevel::Warning, "rotate", "disk almost full");
        let text = line.to_string();
        let re = Regex::new(r"^\[\d{6}_\d{6}\.\d{3}\] \[W\]: rotate: disk almost full\n$").unwrap();
        assert!(re.is_match(&text), "unexpected line: {:?}", text);
    }

    #[test]
    fn test_format_line_keeps_single_newline() {
        let line = format_line(LogLevel::Info, "", "done\n");
        assert!(line.to_string().ends_with("]: done\n"));
        assert!(!line.to_string().ends_with("\n\n"));
    }

    #[test]
    fn test_log_line_is_opaque_bytes() {
        let raw: &[u8] = &[0xff, 0xfe, b'\n'];
        let line = LogLine::from(raw);
        assert_eq!(line.as_bytes(), raw);
        assert_eq!(line.len(), 3);
    }
}
