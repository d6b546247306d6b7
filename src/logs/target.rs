use super::layout::Layout;
use super::severity::Severity;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A single log event as seen by targets
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    /// Logger name, matched against rule name filters
    pub logger: String,
    pub message: String,
    pub exception: Option<String>,
}

impl LogRecord {
    /// Create a record stamped with the current local time
    pub fn new(severity: Severity, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            logger: logger.into(),
            message: message.into(),
            exception: None,
        }
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }
}

/// A named target that appends rendered lines to a file
#[derive(Debug, Clone)]
pub struct FileTarget {
    name: String,
    path: PathBuf,
    layout: Layout,
}

impl FileTarget {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            layout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Append one rendered line for `record`.
    ///
    /// The file is opened per write so that a rollover or external rotation
    /// never leaves the target writing into an unlinked file.
    pub fn write(&self, record: &LogRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut line = self.layout.render(record);
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}
