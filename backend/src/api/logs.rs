//! Operation logs.
//!
//! Pipeline steps report through an [`OperationLog`] tagged with the operation
//! they run for. Entries are rendered to stderr and published on a broadcast
//! channel that `/api/logs` relays as Server-Sent Events, optionally
//! narrowed to one operation (`/api/logs?operation=aggregate`).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Buffered entries per subscriber before the slowest one starts lagging.
const CHANNEL_CAPACITY: usize = 100;

/// The operation a log entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Normalize,
    Aggregate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normalize => "normalize",
            Self::Aggregate => "aggregate",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn marker(self) -> &'static str {
        match self {
            Self::Info => "·",
            Self::Success => "✓",
            Self::Warning => "⚠️",
            Self::Error => "❌",
        }
    }
}

/// One published log line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub operation: Operation,
    pub level: LogLevel,
    pub message: String,
    /// 0 for a pipeline step, 1 for a detail of the step above it
    #[serde(default)]
    pub depth: u8,
}

impl LogEntry {
    /// Whether a subscriber asking for `operation` (or everything) wants this entry.
    pub fn matches(&self, operation: Option<Operation>) -> bool {
        operation.map_or(true, |op| op == self.operation)
    }

    /// Terminal form: `[aggregate]   ✓ 12 students, 4 learning objectives`
    pub fn render(&self) -> String {
        format!(
            "[{}] {}{} {}",
            self.operation,
            "  ".repeat(usize::from(self.depth) + 1),
            self.level.marker(),
            self.message
        )
    }
}

/// Process-wide channel behind `/api/logs`
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Render the entry to stderr (stdout carries CLI tables) and publish it.
    pub fn publish(&self, entry: LogEntry) {
        eprintln!("{}", entry.render());
        // No subscribers is fine
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Logger for one run of an operation.
#[derive(Clone, Copy)]
pub struct OperationLog<'a> {
    operation: Operation,
    broadcaster: &'a LogBroadcaster,
}

impl OperationLog<'static> {
    /// Publish on the global broadcaster.
    pub fn new(operation: Operation) -> Self {
        Self::with_broadcaster(operation, &LOG_BROADCASTER)
    }
}

impl<'a> OperationLog<'a> {
    pub fn with_broadcaster(operation: Operation, broadcaster: &'a LogBroadcaster) -> Self {
        Self { operation, broadcaster }
    }

    fn emit(&self, level: LogLevel, depth: u8, message: impl Into<String>) {
        self.broadcaster.publish(LogEntry {
            operation: self.operation,
            level,
            message: message.into(),
            depth,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, 0, message);
    }

    /// Info line nested under the previous step.
    pub fn detail(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, 1, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(LogLevel::Success, 0, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, 0, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, 0, message);
    }
}
