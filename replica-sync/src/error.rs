//! Error types for replica-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from mirror operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A root handed to the reconciler exists but is not a directory.
    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The source root vanished. It is never recreated.
    #[error("source folder does not exist: {path}")]
    SourceMissing { path: PathBuf },

    /// The replica directory handed to the reconciler does not exist.
    #[error("replica folder does not exist: {path}")]
    ReplicaMissing { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
