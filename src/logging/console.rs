//! Console output - script-facing log lines fanned out to registered sinks
//!
//! Sinks are process-wide: an editor panel or a terminal registers once and
//! sees the output of every environment. Each line is mirrored into
//! `tracing` so it also lands in the structured log.

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Verbose,
    Log,
    Warning,
    Error,
    Assert,
}

impl LogSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Log => "log",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Assert => "assert",
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of console lines
pub trait ConsoleOutput: Send + Sync {
    fn write(&self, severity: LogSeverity, text: &str);
}

/// Token returned by [`register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

struct Sinks {
    next: u64,
    entries: Vec<(SinkId, Arc<dyn ConsoleOutput>)>,
}

static SINKS: Lazy<RwLock<Sinks>> = Lazy::new(|| {
    RwLock::new(Sinks {
        next: 0,
        entries: Vec::new(),
    })
});

pub fn register(sink: Arc<dyn ConsoleOutput>) -> SinkId {
    let mut sinks = SINKS.write();
    let id = SinkId(sinks.next);
    sinks.next += 1;
    sinks.entries.push((id, sink));
    id
}

/// Remove a sink, false if it was not registered
pub fn unregister(id: SinkId) -> bool {
    let mut sinks = SINKS.write();
    let before = sinks.entries.len();
    sinks.entries.retain(|(entry, _)| *entry != id);
    sinks.entries.len() != before
}

pub fn sink_count() -> usize {
    SINKS.read().entries.len()
}

/// Write one line to every sink and to the structured log
pub fn write(severity: LogSeverity, text: &str) {
    match severity {
        LogSeverity::Verbose => debug!(event = "console", severity = severity.as_str(), "{}", text),
        LogSeverity::Log => info!(event = "console", severity = severity.as_str(), "{}", text),
        LogSeverity::Warning => warn!(event = "console", severity = severity.as_str(), "{}", text),
        LogSeverity::Error | LogSeverity::Assert => {
            error!(event = "console", severity = severity.as_str(), "{}", text)
        }
    }

    // clone the list so a sink may register or unregister from inside write
    let sinks: Vec<Arc<dyn ConsoleOutput>> =
        SINKS.read().entries.iter().map(|(_, sink)| Arc::clone(sink)).collect();
    for sink in sinks {
        sink.write(severity, text);
    }
}

/// Sink that keeps every line in memory
#[derive(Default)]
pub struct MemoryOutput {
    lines: Mutex<Vec<(LogSeverity, String)>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(LogSeverity, String)> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl ConsoleOutput for MemoryOutput {
    fn write(&self, severity: LogSeverity, text: &str) {
        self.lines.lock().push((severity, text.to_string()));
    }
}

/// Sink printing to stdout, errors to stderr
pub struct StdOutput;

impl ConsoleOutput for StdOutput {
    fn write(&self, severity: LogSeverity, text: &str) {
        match severity {
            LogSeverity::Warning | LogSeverity::Error | LogSeverity::Assert => {
                eprintln!("[{severity}] {text}")
            }
            _ => println!("{text}"),
        }
    }
}
