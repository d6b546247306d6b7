use crate::error::{LogTargetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered log severity, most verbose first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// All severities in rank order
    pub const ALL: [Severity; 5] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
    ];

    /// Map a configured level name to a severity.
    ///
    /// Only the exact names `Trace`, `Debug`, `Info`, `Warn` and `Error` are
    /// recognized. Anything else falls back to [`Severity::Trace`], so a
    /// misspelled level lets everything through rather than silencing a target.
    pub fn from_name_or_trace(name: &str) -> Self {
        Self::from_exact_name(name).unwrap_or(Severity::Trace)
    }

    /// Exact-name lookup, `None` for anything unrecognized
    pub fn from_exact_name(name: &str) -> Option<Self> {
        match name {
            "Trace" => Some(Severity::Trace),
            "Debug" => Some(Severity::Debug),
            "Info" => Some(Severity::Info),
            "Warn" => Some(Severity::Warn),
            "Error" => Some(Severity::Error),
            _ => None,
        }
    }

    /// Display name as rendered by `${level}`
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "Trace",
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warn => "Warn",
            Severity::Error => "Error",
        }
    }

    /// Whether a record at `severity` passes a `self` minimum
    pub fn permits(&self, severity: Severity) -> bool {
        severity >= *self
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = LogTargetError;

    /// Strict parse used when validating configuration files
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" | "information" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            _ => Err(LogTargetError::UnknownSeverity(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Severity::Trace,
            tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warn,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}
