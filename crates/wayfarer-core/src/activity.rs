use crate::error::Result;
use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Which part of the system produced an activity line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    System,
    User,
    Tokens,
    Model,
    Error,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::System => write!(f, "SYSTEM"),
            LogSource::User => write!(f, "USER"),
            LogSource::Tokens => write!(f, "TOKENS"),
            LogSource::Model => write!(f, "MODEL"),
            LogSource::Error => write!(f, "ERROR"),
        }
    }
}

/// Render one activity line: `[YYYY-MM-DD HH:MM:SS] SOURCE: message`.
pub fn format_line(timestamp: DateTime<Local>, source: LogSource, message: &str) -> String {
    format!(
        "[{}] {}: {}",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        source,
        message
    )
}

/// Append-only diagnostic trail.
///
/// Every entry is mirrored into `tracing`; when a file is attached the line is
/// also appended to it. Write failures are reported and otherwise ignored so a
/// full disk never takes the query path down with it.
pub struct ActivityLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl ActivityLog {
    /// Open (or create) the log file in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path: Some(path),
            file: Mutex::new(Some(file)),
        })
    }

    /// A log that only emits `tracing` events.
    pub fn tracing_only() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn log(&self, source: LogSource, message: impl AsRef<str>) {
        let message = message.as_ref();
        match source {
            LogSource::Error => tracing::error!(source = %source, "{}", message),
            LogSource::Tokens => tracing::debug!(source = %source, "{}", message),
            _ => tracing::info!(source = %source, "{}", message),
        }

        let mut guard = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(file) = guard.as_mut() {
            let line = format_line(Local::now(), source, message);
            if let Err(e) = writeln!(file, "{}", line) {
                tracing::warn!("Failed to append to activity log {:?}: {}", self.path, e);
            }
        }
    }

    pub fn system(&self, message: impl AsRef<str>) {
        self.log(LogSource::System, message)
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogSource::Error, message)
    }
}

impl fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityLog").field("path", &self.path).finish()
    }
}
