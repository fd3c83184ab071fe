use std::cell::RefCell;
use std::path::Path;

use tracing::{error, info};

/// Sink for the records a split run emits. Every successful move is reported through
/// `info`, every failure (fatal or not) through `error`.
pub trait SplitLog {
    fn info(&self, msg: &str);
    fn error(&self, msg: &str);

    /// `info` with the class and path the record is about. Sinks that keep structured
    /// fields override this; the default drops them.
    fn info_at(&self, class: Option<&str>, path: &Path, msg: &str) {
        let _ = (class, path);
        self.info(msg);
    }

    fn error_at(&self, class: Option<&str>, path: &Path, msg: &str) {
        let _ = (class, path);
        self.error(msg);
    }
}

/// Forwards records to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl SplitLog for TracingLog {
    fn info(&self, msg: &str) {
        info!(target: "holdout::split", "{msg}");
    }

    fn error(&self, msg: &str) {
        error!(target: "holdout::split", "{msg}");
    }

    fn info_at(&self, class: Option<&str>, path: &Path, msg: &str) {
        info!(
            target: "holdout::split",
            class = class.unwrap_or(""),
            path = %path.display(),
            "{msg}"
        );
    }

    fn error_at(&self, class: Option<&str>, path: &Path, msg: &str) {
        error!(
            target: "holdout::split",
            class = class.unwrap_or(""),
            path = %path.display(),
            "{msg}"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
}

/// Keeps every record in memory. Used by tests and by callers that want to inspect the
/// run without a subscriber.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: RefCell<Vec<LogRecord>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    fn push(&self, level: Level, msg: &str) {
        self.records.borrow_mut().push(LogRecord {
            level,
            message: msg.to_string(),
        });
    }
}

impl SplitLog for MemoryLog {
    fn info(&self, msg: &str) {
        self.push(Level::Info, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Level::Error, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn located_records_fall_back_to_plain_messages() {
        let log = MemoryLog::new();
        log.info_at(Some("cat"), Path::new("/t/cat/a.png"), "moved a");
        log.error_at(None, Path::new("/t"), "boom");

        assert_eq!(log.messages(Level::Info), vec!["moved a"]);
        assert_eq!(log.messages(Level::Error), vec!["boom"]);
    }

    #[test]
    fn tracing_log_accepts_located_records_without_subscriber() {
        let log = TracingLog;
        log.info_at(Some("cat"), Path::new("/t/cat/a.png"), "moved a");
        log.error_at(None, Path::new("/t"), "boom");
    }

    #[test]
    fn memory_log_keeps_order_and_level() {
        let log = MemoryLog::new();
        log.info("a");
        log.error("b");
        log.info("c");

        assert_eq!(log.records().len(), 3);
        assert_eq!(log.messages(Level::Info), vec!["a", "c"]);
        assert_eq!(log.messages(Level::Error), vec!["b"]);
    }
}
