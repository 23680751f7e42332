//! Error types for replica-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a [`crate::SyncConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The source root does not exist. It is never auto-created.
    #[error("source folder does not exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("source path is not a directory: {path}")]
    SourceNotADirectory { path: PathBuf },

    /// The replica root exists but is something other than a directory.
    #[error("replica path exists but is not a directory: {path}")]
    ReplicaNotADirectory { path: PathBuf },

    /// One root is the other or lies inside it.
    #[error("source and replica folders overlap: {source_root} and {replica_root}")]
    OverlappingRoots {
        source_root: PathBuf,
        replica_root: PathBuf,
    },

    /// Underlying I/O failure while inspecting a configured path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
