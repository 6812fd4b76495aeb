use std::sync::Mutex;

pub use log::Level;

/// Receives the messages of one pipeline run.
///
/// The pipeline logs through a reporter handed to it instead of a global
/// console, so a run can be observed in isolation.
pub trait Reporter: Sync {
    /// Record a message.
    fn log(&self, level: Level, message: &str);

    /// Record an informational message.
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Record a warning.
    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }
}

/// Forwards messages to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "nerfprep", level, "{message}");
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: Mutex<Vec<(Level, String)>>,
}

impl MemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded messages in order.
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether a message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn log(&self, level: Level, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((level, message.to_string()));
    }
}
