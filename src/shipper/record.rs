use crate::shipper::window::{Clock, Delayed, Granularity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity names written to the `level` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        if *level == tracing::Level::ERROR {
            LogLevel::Error
        } else if *level == tracing::Level::WARN {
            LogLevel::Warn
        } else if *level == tracing::Level::INFO {
            LogLevel::Info
        } else if *level == tracing::Level::DEBUG {
            LogLevel::Debug
        } else {
            LogLevel::Trace
        }
    }
}

/// One captured log event, as handed over by a capture adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,

    /// Host or instance the event came from
    pub origin: Option<String>,

    /// Logical component that produced the event
    pub context: Option<String>,

    /// Logger or category name
    pub logger: Option<String>,

    pub level: String,

    /// Event time in epoch milliseconds
    pub timestamp_ms: i64,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl LogEvent {
    pub fn new(message: impl Into<String>, level: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            message: message.into(),
            level: level.into(),
            timestamp_ms,
            ..Default::default()
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A queued event stamped with the closing instant of its batching window.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    event: LogEvent,
    expires_at_ms: i64,
}

impl LogRecord {
    pub fn new(event: LogEvent, expires_at_ms: i64) -> Self {
        Self {
            event,
            expires_at_ms,
        }
    }

    /// Stamp the event with the window that is open right now
    pub fn windowed(event: LogEvent, granularity: Granularity, clock: &dyn Clock) -> Self {
        let expires_at_ms = granularity.next_expiry(clock.now_ms());
        Self::new(event, expires_at_ms)
    }

    pub fn event(&self) -> &LogEvent {
        &self.event
    }

    pub fn message(&self) -> &str {
        &self.event.message
    }

    pub fn origin(&self) -> Option<&str> {
        self.event.origin.as_deref()
    }

    pub fn context(&self) -> Option<&str> {
        self.event.context.as_deref()
    }

    pub fn logger(&self) -> Option<&str> {
        self.event.logger.as_deref()
    }

    pub fn level(&self) -> &str {
        &self.event.level
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.event.timestamp_ms
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.event.metadata
    }
}

impl Delayed for LogRecord {
    fn expires_at_ms(&self) -> i64 {
        self.expires_at_ms
    }
}
