//! Event sinks — where [`SyncEvent`] lines end up.
//!
//! The production sink appends each line to the log file (opened in append
//! mode per write) and echoes it to stdout. A failed append never swallows
//! the event: the stdout copy is still written and a warning is logged.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use replica_core::SyncEvent;

/// Consumer of mirror events.
pub trait EventSink {
    fn emit(&mut self, event: &SyncEvent);
}

/// Collects events in memory. Used by tests and dry inspection.
impl EventSink for Vec<SyncEvent> {
    fn emit(&mut self, event: &SyncEvent) {
        self.push(event.clone());
    }
}

/// Appends event lines to a log file and mirrors them to stdout.
#[derive(Debug, Clone)]
pub struct LogFileSink {
    path: PathBuf,
    echo_stdout: bool,
}

impl LogFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo_stdout: true,
        }
    }

    /// Same sink without the stdout copy.
    pub fn file_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo_stdout: false,
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{line}")
    }
}

impl EventSink for LogFileSink {
    fn emit(&mut self, event: &SyncEvent) {
        let line = event.to_string();
        let appended = self.append(&line);
        if let Err(err) = &appended {
            tracing::warn!(
                "could not append to log file {}: {err}",
                self.path.display()
            );
        }
        if self.echo_stdout || appended.is_err() {
            println!("{line}");
        }
    }
}
