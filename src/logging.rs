//! Logging collaborators
//!
//! Session code never writes to `tracing` or to disk on its own; it logs
//! through a [`LogSink`] handed in by whoever creates the session. The binary
//! wires a [`TracingSink`] and sets up the subscriber (stderr plus an optional
//! log file) with [`init_tracing`].

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Result, VickyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Append-only log sink shared by every session.
///
/// Implementations must tolerate concurrent calls and must never fail.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Forwards to `tracing`. Session ids come from the enclosing span.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "vicky::session", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "vicky::session", "{}", message),
            LogLevel::Error => tracing::error!(target: "vicky::session", "{}", message),
        }
    }
}

/// One captured line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

/// Keeps every line in memory. Used by tests and by embedders that want to
/// inspect a run after the fact.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages logged at `level`, in order
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    /// True if any line at any level contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.records.lock().iter().any(|r| r.message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
        });
    }
}

/// Log file name for a run: `vicky_<DD-MM-YYYY>_<HH-MM-SS>_<run-id>.log`
pub fn log_file_name(run_id: &str, now: chrono::DateTime<chrono::Local>) -> String {
    format!("vicky_{}_{}.log", now.format("%d-%m-%Y_%H-%M-%S"), run_id)
}

/// Install the global subscriber.
///
/// Always logs to stderr. When `log_dir` is set, the same lines are appended
/// to a per-run log file inside it, whose path is returned. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(log_dir: Option<&Path>, run_id: &str) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vicky=info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, path) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(log_file_name(run_id, chrono::Local::now()));
            let file = File::options().create(true).append(true).open(&path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| VickyError::Config {
            message: format!("Failed to install log subscriber: {}", e),
        })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_memory_sink_captures_levels() {
        let sink = MemorySink::new();
        sink.info("Now playing (Vicky)");
        sink.warn("careful");
        sink.error("broken");

        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.messages(LogLevel::Warn), vec!["careful".to_string()]);
        assert!(sink.contains("Now playing"));
        assert!(!sink.contains("absent"));
    }

    #[test]
    fn test_second_init_fails_the_same_with_or_without_log_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        // Only one global subscriber can exist; whichever call runs first may
        // succeed, every later one must report a config error.
        let first = init_tracing(None, "a");
        let with_dir = init_tracing(Some(dir.path()), "b");
        let without_dir = init_tracing(None, "c");

        assert!(matches!(with_dir, Err(VickyError::Config { .. })));
        assert!(matches!(without_dir, Err(VickyError::Config { .. })));
        if let Err(e) = first {
            assert!(matches!(e, VickyError::Config { .. }));
        }
    }

    #[test]
    fn test_log_file_name_format() {
        let now = chrono::Local.with_ymd_and_hms(2025, 5, 10, 15, 30, 20).unwrap();
        assert_eq!(
            log_file_name("1234", now),
            "vicky_10-05-2025_15-30-20_1234.log"
        );
    }
}
