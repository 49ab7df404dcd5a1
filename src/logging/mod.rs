//! Logging infrastructure - structured tracing for the lifecycle bridge
//!
//! Design: every lifecycle transition emits a `tracing` event with an
//! `event = "..."` field so logs can be filtered and aggregated by kind:
//! - Configurable level, format and destination
//! - Zero-cost when disabled
//! - Daily-rotated file output through `tracing-appender`
//! - Console sinks for script-facing output (see [`console`])

pub mod console;


use crate::allocator::VariantHandle;
use crate::core::{ClassId, NativePtr, ObjectId, StringName};
use crate::handles::{Ownership, ReferencePolicy, Teardown};
use crate::registry::ClassKind;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, trace, warn, Level};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// Single line per event
    Compact,
    /// Structured JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// File with daily rotation
    File { directory: String, prefix: String },
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Emit span open/close events
    pub span_events: bool,
    /// Extra filter directives (e.g. "jsbridge::handles=trace")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // JSB_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level) = std::env::var("JSB_LOG_LEVEL") {
            config.level = parse_level(&level);
        }

        // JSB_LOG_FORMAT: pretty, compact, json
        if let Ok(format) = std::env::var("JSB_LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                config.format = format;
            }
        }

        // JSB_LOG_FILE: directory/prefix of a rolling log file
        if let Ok(path) = std::env::var("JSB_LOG_FILE") {
            config.output = file_output(Path::new(&path));
        }

        config.span_events = std::env::var("JSB_LOG_SPANS").is_ok();
        config
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Parse a level name, falling back to `INFO`
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Split a log file path into rolling-appender directory and prefix
pub fn file_output(path: &Path) -> LogOutput {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());
    let prefix = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "jsbridge.log".to_string());
    LogOutput::File { directory, prefix }
}

/// Initialize the global subscriber
///
/// Only the first call installs anything; later calls return `None`. The
/// returned guard flushes the background writer when dropped, so keep it
/// alive for as long as events should be written.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    let mut guard = None;
    LOGGER_INITIALIZED.get_or_init(|| {
        guard = install(config);
    });
    guard
}

/// Initialize logging from `JSB_*` environment variables
pub fn init() -> Option<WorkerGuard> {
    init_logging(LogConfig::from_env())
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

fn install(config: LogConfig) -> Option<WorkerGuard> {
    let filter = build_filter(&config);
    let spans = span_events_config(config.span_events);

    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .pretty()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(writer)
            .compact()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
    };

    // another subscriber may already be installed, e.g. by a test harness
    match tracing_subscriber::registry().with(layer).try_init() {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let base_filter = EnvFilter::from_default_env().add_directive(config.level.into());

    match &config.filter {
        Some(filter_str) => filter_str
            .split(',')
            .filter(|directive| !directive.trim().is_empty())
            .fold(base_filter, |filter, directive| {
                filter.add_directive(directive.trim().parse().unwrap_or_else(|_| {
                    warn!("Invalid filter directive: {}", directive);
                    config.level.into()
                }))
            }),
        None => base_filter,
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Initialize logging with defaults for development
pub fn init_dev_logging() -> Option<WorkerGuard> {
    init_logging(LogConfig {
        level: Level::DEBUG,
        format: LogFormat::Pretty,
        output: LogOutput::Stderr,
        span_events: true,
        filter: Some("jsbridge=debug".to_string()),
    })
}

// ============================================================================
// Lifecycle events
// ============================================================================

pub fn log_environment_created(thread: &str, object_capacity: usize) {
    info!(
        event = "environment_created",
        thread,
        object_capacity,
        "Environment created"
    );
}

pub fn log_class_registered(id: ClassId, name: &StringName, kind: ClassKind) {
    debug!(
        event = "class_registered",
        class_id = id.index(),
        name = %name,
        kind = ?kind,
        "Class registered"
    );
}

#[inline]
pub fn log_bind(pointer: NativePtr, id: ObjectId, class_id: ClassId, policy: ReferencePolicy, holds_reference: bool) {
    trace!(
        event = "bind",
        pointer = %pointer,
        object_id = %id,
        class_id = class_id.index(),
        policy = ?policy,
        holds_reference,
        "Object bound"
    );
}

#[inline]
pub fn log_unbind(pointer: NativePtr, id: ObjectId, teardown: Teardown) {
    trace!(
        event = "unbind",
        pointer = %pointer,
        object_id = %id,
        teardown = teardown.as_str(),
        "Object unbound"
    );
}

#[inline]
pub fn log_finalized(pointer: NativePtr, destroyed: bool) {
    trace!(
        event = "finalized",
        pointer = %pointer,
        destroyed,
        "Wrapper finalized by collector"
    );
}

#[inline]
pub fn log_ownership_flip(pointer: NativePtr, from: Ownership, to: Ownership) {
    trace!(
        event = "ownership_flip",
        pointer = %pointer,
        from = ?from,
        to = ?to,
        "Ownership changed"
    );
}

pub fn log_persistent(pointer: NativePtr) {
    debug!(event = "persistent", pointer = %pointer, "Object marked persistent");
}

pub fn log_sweep_start(live: usize) {
    info!(event = "sweep_start", live, "Force-finalizing remaining handles");
}

pub fn log_sweep_complete(duration_us: u64, released: usize, leaked_values: usize) {
    info!(
        event = "sweep_complete",
        released,
        leaked_values,
        duration_us,
        "Environment torn down"
    );
}

#[inline]
pub fn log_value_disposed(handle: &VariantHandle, type_name: &str) {
    trace!(
        event = "value_disposed",
        handle = %handle,
        value_type = type_name,
        "Value payload returned to pool"
    );
}

/// Performance tracking utilities
pub mod perf {
    use std::time::Instant;
    use tracing::debug;

    /// Track operation duration (returns guard that logs on drop)
    #[must_use]
    pub fn track(operation: &'static str) -> PerformanceGuard {
        PerformanceGuard {
            operation,
            start: Instant::now(),
        }
    }

    pub struct PerformanceGuard {
        operation: &'static str,
        start: Instant,
    }

    impl Drop for PerformanceGuard {
        fn drop(&mut self) {
            debug!(
                operation = self.operation,
                duration_us = self.start.elapsed().as_micros() as u64,
                "operation completed"
            );
        }
    }
}
