//! Append-only error log
//!
//! Every handled error (failed API call, failed discovery step, failed
//! harvest task) becomes one `<RFC3339 timestamp> - <message>` line.

use chrono::Utc;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

enum Sink {
    File { path: PathBuf, file: Mutex<File> },
    Memory(Mutex<Vec<String>>),
}

/// Shared, line-oriented error log
///
/// Write failures never propagate: they are reported through tracing and
/// the caller carries on.
pub struct ErrorLog {
    sink: Sink,
}

impl ErrorLog {
    /// Opens the log file at `path` for appending, creating it if missing
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Sink::File {
                path: path.to_path_buf(),
                file: Mutex::new(file),
            },
        })
    }

    /// Creates a log that keeps its lines in memory
    pub fn in_memory() -> Self {
        Self {
            sink: Sink::Memory(Mutex::new(Vec::new())),
        }
    }

    /// Appends one timestamped line
    pub fn record(&self, message: impl Display) {
        tracing::warn!("{}", message);

        let line = format!("{} - {}", Utc::now().to_rfc3339(), message);
        match &self.sink {
            Sink::File { path, file } => {
                let result = match file.lock() {
                    Ok(mut file) => writeln!(file, "{}", line),
                    Err(_) => Err(io::Error::new(io::ErrorKind::Other, "error log lock poisoned")),
                };
                if let Err(e) = result {
                    tracing::error!("Failed to write to error log {}: {}", path.display(), e);
                }
            }
            Sink::Memory(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
            }
        }
    }

    /// Returns every line recorded so far
    pub fn entries(&self) -> Vec<String> {
        match &self.sink {
            Sink::File { path, .. } => std::fs::read_to_string(path)
                .map(|content| content.lines().map(str::to_string).collect())
                .unwrap_or_default(),
            Sink::Memory(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
        }
    }
}
