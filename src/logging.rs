use std::sync::Mutex;
use tracing::{error, info, warn};

/// Log sink the supervisor forwards its output to
///
/// Implemented by the host application; the supervisor only consumes it.
/// Every line is already prefixed with the component tag, so sinks can pass
/// messages through unchanged.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink forwarding to the `tracing` macros
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

/// Severity of a captured [`MemorySink`] line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for SinkLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkLevel::Info => write!(f, "info"),
            SinkLevel::Warn => write!(f, "warn"),
            SinkLevel::Error => write!(f, "error"),
        }
    }
}

/// Capturing sink that records every line in memory
///
/// Useful for tests and for host applications that surface supervisor logs in
/// their own UI instead of a tracing subscriber.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(SinkLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured lines in arrival order
    pub fn lines(&self) -> Vec<(SinkLevel, String)> {
        self.lines.lock().unwrap().clone()
    }

    /// Whether any captured line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(_, line)| line.contains(needle))
    }

    /// Whether any captured line at `level` contains `needle`
    pub fn contains_at(&self, level: SinkLevel, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }

    /// Number of captured lines containing `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, line)| line.contains(needle))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }

    fn push(&self, level: SinkLevel, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

impl LogSink for MemorySink {
    fn info(&self, message: &str) {
        self.push(SinkLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(SinkLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(SinkLevel::Error, message);
    }
}
