//! Structured run reporter.
//!
//! Every run writes to exactly one sink: the interactive console or a log
//! file. Lines are either bare content (device command output) or status lines
//! prefixed with a bracketed timestamp:
//!
//! ```text
//! [03/14/2024 9:05:11] Connecting to edge1.example.net (1 of 2, 50%)
//! set vlans v120 vlan-id 120
//! [03/14/2024 9:05:13] Completed with 0 error(s)
//! ```
//!
//! When the log destination already exists the operator is asked once, at
//! open time, whether to overwrite it. Declining keeps the prior content and
//! appends to it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use colored::Colorize;
use tracing::debug;

use crate::error::{Error, Result};

/// Default timestamp format for status lines (`MM/DD/YYYY H:MM:SS`, 24-hour).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %-H:%M:%S";

/// First line of the per-device failure message.
pub const CONNECTIVITY_FAILURE: &str = "Unable to complete the session: connectivity problem";

/// Second line of the per-device failure message.
pub const CREDENTIAL_HINT: &str =
    "Verify the credentials and that the device is reachable over SSH";

/// Produces the timestamp text for one status line.
pub type TimestampFn = Box<dyn Fn() -> String + Send + Sync>;

/// Check that a `chrono` format string renders without error.
pub fn validate_timestamp_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::TimestampFormat(format.to_string()));
    }
    Ok(())
}

/// Build a timestamp function over local time with a `chrono` format string.
///
/// The format is checked here, once, so rendering a status line never fails.
pub fn local_timestamp(format: impl Into<String>) -> Result<TimestampFn> {
    let format = format.into();
    validate_timestamp_format(&format)?;
    Ok(local_clock(format))
}

fn local_clock(format: String) -> TimestampFn {
    Box::new(move || chrono::Local::now().format(&format).to_string())
}

/// Asks whether an existing log file may be overwritten.
pub trait OverwritePrompt {
    /// Return `true` only on an affirmative answer.
    fn confirm_overwrite(&self, path: &Path) -> bool;
}

/// Answers every overwrite question with a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl OverwritePrompt for FixedAnswer {
    fn confirm_overwrite(&self, _path: &Path) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Status,
    Warning,
    Error,
}

enum Sink {
    Console {
        writer: Box<dyn Write + Send>,
        color: bool,
    },
    LogFile {
        path: PathBuf,
        writer: BufWriter<File>,
    },
}

/// Writes content and timestamped status lines to the run's sink.
pub struct Reporter {
    sink: Sink,
    timestamp: TimestampFn,
}

impl Reporter {
    /// Report to standard output.
    pub fn console(color: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), color)
    }

    /// Report to an arbitrary writer.
    pub fn with_writer(writer: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            sink: Sink::Console { writer, color },
            timestamp: local_clock(DEFAULT_TIMESTAMP_FORMAT.to_string()),
        }
    }

    /// Report to a log file.
    ///
    /// If `path` exists, `prompt` is asked exactly once. On confirmation the
    /// file is deleted and recreated empty; otherwise new lines are appended
    /// and the prior content is left untouched.
    pub fn log_file(path: impl AsRef<Path>, prompt: &dyn OverwritePrompt) -> Result<Self> {
        let path = path.as_ref();
        let log_err = |source: io::Error| Error::LogFile {
            path: path.to_path_buf(),
            source,
        };

        if path.exists() && prompt.confirm_overwrite(path) {
            debug!(path = %path.display(), "Overwriting existing log file");
            fs::remove_file(path).map_err(log_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(log_err)?;

        Ok(Self {
            sink: Sink::LogFile {
                path: path.to_path_buf(),
                writer: BufWriter::new(file),
            },
            timestamp: local_clock(DEFAULT_TIMESTAMP_FORMAT.to_string()),
        })
    }

    /// Replace the timestamp function.
    pub fn with_timestamp(mut self, timestamp: TimestampFn) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The log file path, when reporting to a file.
    pub fn log_destination(&self) -> Option<&Path> {
        match &self.sink {
            Sink::LogFile { path, .. } => Some(path),
            Sink::Console { .. } => None,
        }
    }

    /// Write device output as bare lines.
    pub fn content(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.write_line(text)
    }

    /// Write a timestamped status line.
    pub fn status(&mut self, message: impl AsRef<str>) -> Result<()> {
        self.emit(Level::Status, message.as_ref())
    }

    /// Write a timestamped warning line.
    pub fn warn(&mut self, message: impl AsRef<str>) -> Result<()> {
        self.emit(Level::Warning, message.as_ref())
    }

    /// Write a timestamped error line.
    pub fn error(&mut self, message: impl AsRef<str>) -> Result<()> {
        self.emit(Level::Error, message.as_ref())
    }

    /// Write the fixed two-line failure message for a device.
    pub fn device_failure(&mut self, device: &str, detail: &str) -> Result<()> {
        debug!(device = %device, detail = %detail, "Device failed");
        self.error(format!("{}: {}", device, CONNECTIVITY_FAILURE))?;
        self.error(CREDENTIAL_HINT)
    }

    fn emit(&mut self, level: Level, message: &str) -> Result<()> {
        debug!(level = ?level, "{}", message);

        let stamp = format!("[{}]", (self.timestamp)());
        let line = match &self.sink {
            Sink::Console { color: true, .. } => {
                let message = match level {
                    Level::Status => message.normal(),
                    Level::Warning => message.yellow(),
                    Level::Error => message.red(),
                };
                format!("{} {}", stamp.dimmed(), message)
            }
            _ => format!("{} {}", stamp, message),
        };
        self.write_line(&line)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        match &mut self.sink {
            Sink::Console { writer, .. } => {
                writeln!(writer, "{}", line)?;
                writer.flush()?;
            }
            Sink::LogFile { path, writer } => {
                let result = writeln!(writer, "{}", line).and_then(|_| writer.flush());
                result.map_err(|source| Error::LogFile {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match &self.sink {
            Sink::Console { color, .. } => format!("Console(color={})", color),
            Sink::LogFile { path, .. } => format!("LogFile({})", path.display()),
        };
        f.debug_struct("Reporter").field("sink", &sink).finish()
    }
}
