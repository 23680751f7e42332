//! Domain types for the replica mirror.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Nothing here is persisted: every value is recomputed from disk on each pass.

use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Directory entries
// ---------------------------------------------------------------------------

/// What a listed path is, as seen without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, sockets, FIFOs, devices. Never mirrored.
    Other,
}

impl EntryKind {
    pub fn from_file_type(ty: std::fs::FileType) -> Self {
        if ty.is_file() {
            EntryKind::File
        } else if ty.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Other => "special",
        };
        f.write_str(s)
    }
}

/// One child of a listed directory. Lives only for the iteration that read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Final path component, used to pair source and replica entries.
    pub name: OsString,
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl DirectoryEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

// ---------------------------------------------------------------------------
// Checksums
// ---------------------------------------------------------------------------

/// Hex-encoded content digest. Two files are equal iff their values match,
/// provided both were produced by the same digester.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChecksumValue(pub String);

impl ChecksumValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ChecksumValue {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChecksumValue {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Process-lifetime mirror configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub source_root: PathBuf,
    pub replica_root: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
}

impl SyncConfig {
    /// Validate the roots and build a config.
    ///
    /// The source root must already exist as a directory. The replica root
    /// may be absent (it is created on the first pass) but must not be a
    /// non-directory. Neither root may contain the other.
    pub fn new(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        interval: Duration,
    ) -> Result<Self, ConfigError> {
        let source_root = source_root.into();
        let replica_root = replica_root.into();

        match std::fs::metadata(&source_root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ConfigError::SourceNotADirectory { path: source_root }),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::SourceMissing { path: source_root })
            }
            Err(err) => {
                return Err(ConfigError::Io {
                    path: source_root,
                    source: err,
                })
            }
        }

        if let Some(false) = existing_is_dir(&replica_root)? {
            return Err(ConfigError::ReplicaNotADirectory { path: replica_root });
        }

        let resolved_source = resolve(&source_root)?;
        let resolved_replica = resolve(&replica_root)?;
        if resolved_source.starts_with(&resolved_replica)
            || resolved_replica.starts_with(&resolved_source)
        {
            return Err(ConfigError::OverlappingRoots {
                source_root,
                replica_root,
            });
        }

        Ok(Self {
            source_root,
            replica_root,
            log_file: log_file.into(),
            interval,
        })
    }

    /// Convenience constructor for whole-second intervals, as given on the
    /// command line.
    pub fn with_interval_secs(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        interval_secs: u64,
    ) -> Result<Self, ConfigError> {
        Self::new(
            source_root,
            replica_root,
            log_file,
            Duration::from_secs(interval_secs),
        )
    }
}

/// `None` when `path` does not exist, otherwise whether it is a directory.
fn existing_is_dir(path: &Path) -> Result<Option<bool>, ConfigError> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.is_dir())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

/// Canonical form of `path`, which need not exist yet: the deepest existing
/// ancestor is canonicalized and the missing tail appended to it.
fn resolve(path: &Path) -> Result<PathBuf, ConfigError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            })?
            .join(path)
    };

    let mut tail = Vec::new();
    let mut cursor = absolute.as_path();
    loop {
        match std::fs::canonicalize(cursor) {
            Ok(mut base) => {
                base.extend(tail.iter().rev());
                return Ok(base);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(ConfigError::Io {
                    path: cursor.to_path_buf(),
                    source: err,
                })
            }
        }
        match (cursor.parent(), cursor.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                cursor = parent;
            }
            _ => return Ok(absolute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entry_kind_display_is_lowercase() {
        assert_eq!(EntryKind::File.to_string(), "file");
        assert_eq!(EntryKind::Directory.to_string(), "directory");
        assert_eq!(EntryKind::Other.to_string(), "special");
    }

    #[test]
    fn entry_kind_from_file_type() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();

        let file_ty = std::fs::symlink_metadata(&file).unwrap().file_type();
        let dir_ty = std::fs::symlink_metadata(tmp.path()).unwrap().file_type();
        assert_eq!(EntryKind::from_file_type(file_ty), EntryKind::File);
        assert_eq!(EntryKind::from_file_type(dir_ty), EntryKind::Directory);
    }

    #[test]
    fn checksum_value_compares_by_string() {
        let a = ChecksumValue::from("abc");
        let b = ChecksumValue::from("abc".to_string());
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "abc");
        assert_eq!(a.to_string(), "abc");
    }

    #[test]
    fn interval_secs_become_duration() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("source")).unwrap();
        let cfg = SyncConfig::with_interval_secs(
            tmp.path().join("source"),
            tmp.path().join("replica"),
            tmp.path().join("sync.log"),
            20,
        )
        .unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(20));
    }

    #[test]
    fn resolve_keeps_missing_tail_under_canonical_base() {
        let tmp = TempDir::new().unwrap();
        let base = std::fs::canonicalize(tmp.path()).unwrap();
        let resolved = resolve(&tmp.path().join("a").join("b")).unwrap();
        assert_eq!(resolved, base.join("a").join("b"));
    }

    #[test]
    fn resolve_collapses_dot_dot_through_existing_dirs() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("x")).unwrap();
        let base = std::fs::canonicalize(tmp.path()).unwrap();
        let resolved = resolve(&tmp.path().join("x").join("..").join("y")).unwrap();
        assert_eq!(resolved, base.join("y"));
    }
}
