use std::path::PathBuf;
use thiserror::Error;

/// Main error type for log target management
#[derive(Debug, Error)]
pub enum LogTargetError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    // Log file errors
    #[error("Failed to prepare log file: {0}")]
    LogFileError(String),

    #[error("Log rollover failed: {0}")]
    RolloverError(String),

    #[error("Archive file already exists: {}", .0.display())]
    ArchiveExists(PathBuf),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for log target operations
pub type Result<T> = std::result::Result<T, LogTargetError>;
