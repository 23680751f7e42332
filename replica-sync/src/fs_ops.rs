//! Thin filesystem helpers shared by the reconciler and the prune sweep.
//!
//! Nothing here follows symlinks: kinds come from `symlink_metadata` /
//! `DirEntry::file_type`, and links are removed as links.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use filetime::FileTime;

use replica_core::{DirectoryEntry, EntryKind, SyncEvent};

use crate::error::{io_err, SyncError};

/// List the children of `dir`, sorted by name for deterministic logs.
pub fn list_dir(dir: &Path) -> Result<Vec<DirectoryEntry>, SyncError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let ty = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
        entries.push(DirectoryEntry {
            name: entry.file_name(),
            path: entry.path(),
            kind: EntryKind::from_file_type(ty),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Kind of whatever sits at `path`, or `None` if nothing does.
pub fn entry_kind(path: &Path) -> Result<Option<EntryKind>, SyncError> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(EntryKind::from_file_type(meta.file_type()))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Copy content and permission bits, then carry over access/modification
/// times. A failure to set times is only logged.
pub fn copy_file(source: &Path, replica: &Path) -> Result<(), SyncError> {
    fs::copy(source, replica).map_err(|e| io_err(replica, e))?;

    let meta = fs::metadata(source).map_err(|e| io_err(source, e))?;
    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);
    if let Err(err) = filetime::set_file_times(replica, atime, mtime) {
        tracing::warn!(
            "copied {} but could not preserve timestamps: {err}",
            replica.display()
        );
    }
    Ok(())
}

/// Create a single replica directory. The parent must already exist.
pub fn create_dir(path: &Path) -> Result<(), SyncError> {
    fs::create_dir(path).map_err(|e| io_err(path, e))
}

/// Delete `path` according to `kind` and return the matching event.
///
/// Directories go with all their descendants; the caller emits exactly one
/// event for the whole subtree.
pub fn remove_entry(path: &Path, kind: EntryKind) -> Result<SyncEvent, SyncError> {
    match kind {
        EntryKind::Directory => {
            fs::remove_dir_all(path).map_err(|e| io_err(path, e))?;
            Ok(SyncEvent::RemovedDirectory {
                path: path.to_path_buf(),
            })
        }
        EntryKind::File | EntryKind::Other => {
            fs::remove_file(path).map_err(|e| io_err(path, e))?;
            Ok(SyncEvent::RemovedFile {
                path: path.to_path_buf(),
            })
        }
    }
}
