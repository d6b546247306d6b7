use crate::error::{LogTargetError, Result};
use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A log file with more lines than this is archived before registration
pub const ROLLOVER_LINE_THRESHOLD: usize = 10_000;

/// Suffix the archive timestamp is inserted in front of
const LOG_SUFFIX: &str = ".log";

/// Result of preparing a backing log file
#[derive(Debug)]
pub enum SetupOutcome {
    /// The file did not exist and an empty one was created
    Created,
    /// The file existed and stayed at or under the threshold
    Retained { lines: usize },
    /// The file was over the threshold, copied to `archive` and replaced by an empty file
    Archived { archive: PathBuf, lines: usize },
    /// Preparation failed part-way; logging proceeds with whatever is on disk
    Degraded(LogTargetError),
}

impl SetupOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SetupOutcome::Degraded(_))
    }

    /// Archive path, if a rollover happened
    pub fn archive(&self) -> Option<&Path> {
        match self {
            SetupOutcome::Archived { archive, .. } => Some(archive),
            _ => None,
        }
    }
}

impl fmt::Display for SetupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupOutcome::Created => write!(f, "created"),
            SetupOutcome::Retained { lines } => write!(f, "kept ({} lines)", lines),
            SetupOutcome::Archived { archive, lines } => {
                write!(f, "archived {} lines to {}", lines, archive.display())
            }
            SetupOutcome::Degraded(e) => write!(f, "degraded: {}", e),
        }
    }
}

/// Make sure the log file at `path` exists and roll it over if it grew
/// past [`ROLLOVER_LINE_THRESHOLD`].
///
/// Never fails: any error is reported as [`SetupOutcome::Degraded`].
pub fn prepare_log_file(path: &Path) -> SetupOutcome {
    match try_prepare_log_file(path, &Local::now()) {
        Ok(outcome) => outcome,
        Err(e) => SetupOutcome::Degraded(e),
    }
}

fn try_prepare_log_file<Tz>(path: &Path, now: &DateTime<Tz>) -> Result<SetupOutcome>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    // Create the parent directory if it doesn't exist
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LogTargetError::LogFileError(format!(
                "Failed to create log directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    if !path.exists() {
        File::create(path).map_err(|e| {
            LogTargetError::LogFileError(format!(
                "Failed to create log file {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok(SetupOutcome::Created);
    }

    let lines = count_lines(path)?;
    if lines <= ROLLOVER_LINE_THRESHOLD {
        return Ok(SetupOutcome::Retained { lines });
    }

    let archive = archive_path(path, now)?;
    archive_log(path, &archive)?;

    Ok(SetupOutcome::Archived { archive, lines })
}

/// Count lines the way a line reader would: `\n`, `\r\n` and a lone `\r`
/// each end a line, and a trailing terminator does not start an extra line.
pub fn count_lines(path: &Path) -> Result<usize> {
    let file = File::open(path).map_err(|e| {
        LogTargetError::LogFileError(format!("Failed to open {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);

    let mut count = 0;
    let mut after_cr = false;
    let mut open_line = false;

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }

        for &byte in buf {
            match byte {
                // Second half of `\r\n`, already counted
                b'\n' if after_cr => {}
                b'\n' | b'\r' => count += 1,
                _ => {}
            }
            open_line = byte != b'\n' && byte != b'\r';
            after_cr = byte == b'\r';
        }

        let len = buf.len();
        reader.consume(len);
    }

    if open_line {
        count += 1;
    }

    Ok(count)
}

/// Copy `path` to `archive`, delete the original and leave a fresh empty file
fn archive_log(path: &Path, archive: &Path) -> Result<()> {
    if archive.exists() {
        return Err(LogTargetError::ArchiveExists(archive.to_path_buf()));
    }

    fs::copy(path, archive).map_err(|e| {
        LogTargetError::RolloverError(format!(
            "Failed to copy {} to {}: {}",
            path.display(),
            archive.display(),
            e
        ))
    })?;

    fs::remove_file(path).map_err(|e| {
        LogTargetError::RolloverError(format!("Failed to delete {}: {}", path.display(), e))
    })?;

    File::create(path).map_err(|e| {
        LogTargetError::RolloverError(format!("Failed to recreate {}: {}", path.display(), e))
    })?;

    Ok(())
}

/// Timestamp safe for use inside a file name, e.g. `10-17-2026 3_04_05 PM`
pub fn archive_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.format("%m/%d/%Y %-I:%M:%S %p")
        .to_string()
        .replace('/', "-")
        .replace(':', "_")
}

/// Archive path in the same directory: the timestamp goes in front of the
/// trailing `.log`, or is followed by `.log` when the name has no such suffix.
pub fn archive_path<Tz>(path: &Path, at: &DateTime<Tz>) -> Result<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let file_name = path.file_name().and_then(|s| s.to_str()).ok_or_else(|| {
        LogTargetError::RolloverError(format!("Invalid log file name: {}", path.display()))
    })?;

    let stem = file_name.strip_suffix(LOG_SUFFIX).unwrap_or(file_name);
    let archive_name = format!("{}{}{}", stem, archive_timestamp(at), LOG_SUFFIX);

    Ok(path.with_file_name(archive_name))
}
