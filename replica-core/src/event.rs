//! Event log vocabulary.
//!
//! Every externally visible action of a pass maps to exactly one
//! [`SyncEvent`]. The `Display` form is the line written to the log file and
//! stdout, without the trailing newline.

use std::fmt;
use std::path::PathBuf;

/// A single mirror action, rendered as one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The replica root was missing and has been created.
    CreatedRoot { path: PathBuf },
    /// A source file was copied over (or into) the replica.
    Copied { source: PathBuf, replica: PathBuf },
    /// A replica subdirectory was created.
    CreatedDirectory { path: PathBuf },
    /// A replica file (or link) with no source counterpart was deleted.
    RemovedFile { path: PathBuf },
    /// A replica directory was deleted together with all its descendants.
    RemovedDirectory { path: PathBuf },
}

impl SyncEvent {
    /// True for the events that delete something from the replica.
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            SyncEvent::RemovedFile { .. } | SyncEvent::RemovedDirectory { .. }
        )
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::CreatedRoot { path } => write!(f, "Created {} folder", path.display()),
            SyncEvent::Copied { source, replica } => {
                write!(f, "Copied: {} to {}", source.display(), replica.display())
            }
            SyncEvent::CreatedDirectory { path } => {
                write!(f, "Created directory: {}", path.display())
            }
            SyncEvent::RemovedFile { path } => write!(f, "Removed file: {}", path.display()),
            SyncEvent::RemovedDirectory { path } => {
                write!(f, "Removed directory: {}", path.display())
            }
        }
    }
}
