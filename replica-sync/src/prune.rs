//! Prune sweep — delete replica entries with no same-named source entry.
//!
//! Matching is by name only, one directory level at a time. A deleted
//! directory produces a single `Removed directory` event; its descendants
//! are removed silently with it.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;

use replica_core::EntryKind;

use crate::error::SyncError;
use crate::fs_ops;
use crate::report::{Operation, PassContext, PassReport};
use crate::sink::EventSink;

/// Remove everything in `replica_dir` that has no counterpart in `source_dir`.
///
/// Only regular files and directories in the source count as counterparts;
/// a replica entry shadowing a source symlink or special file is removed.
pub fn prune(
    source_dir: &Path,
    replica_dir: &Path,
    sink: &mut dyn EventSink,
) -> Result<PassReport, SyncError> {
    let source_names = mirrored_names(source_dir)?;
    let mut ctx = PassContext::new(sink);
    prune_level(&mut ctx, replica_dir, &source_names);
    Ok(ctx.finish())
}

/// Names of the entries in `source_dir` that the mirror reproduces.
fn mirrored_names(source_dir: &Path) -> Result<HashSet<OsString>, SyncError> {
    Ok(fs_ops::list_dir(source_dir)?
        .into_iter()
        .filter(|e| e.kind != EntryKind::Other)
        .map(|e| e.name)
        .collect())
}

/// Sweep one replica level against an already-known set of source names.
pub(crate) fn prune_level(
    ctx: &mut PassContext<'_>,
    replica_dir: &Path,
    source_names: &HashSet<OsString>,
) {
    let entries = match fs_ops::list_dir(replica_dir) {
        Ok(entries) => entries,
        Err(err) => {
            ctx.fail(replica_dir, Operation::List, err);
            return;
        }
    };

    for entry in entries {
        if source_names.contains(&entry.name) {
            continue;
        }
        match fs_ops::remove_entry(&entry.path, entry.kind) {
            Ok(event) => ctx.emit(event),
            Err(err) => ctx.fail(&entry.path, Operation::Remove, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_core::SyncEvent;
    use std::fs;
    use tempfile::TempDir;

    fn pair() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        (tmp, src, dst)
    }

    #[test]
    fn removes_stale_file_and_directory() {
        let (_tmp, src, dst) = pair();
        fs::write(src.join("keep.txt"), "k").unwrap();
        fs::write(dst.join("keep.txt"), "k").unwrap();
        fs::write(dst.join("stale.txt"), "s").unwrap();
        fs::create_dir_all(dst.join("old").join("nested")).unwrap();
        fs::write(dst.join("old").join("nested").join("f.txt"), "f").unwrap();

        let mut events: Vec<SyncEvent> = Vec::new();
        let report = prune(&src, &dst, &mut events).unwrap();

        assert_eq!(
            events,
            vec![
                SyncEvent::RemovedDirectory {
                    path: dst.join("old")
                },
                SyncEvent::RemovedFile {
                    path: dst.join("stale.txt")
                },
            ]
        );
        assert_eq!(report.removed_dirs, 1);
        assert_eq!(report.removed_files, 1);
        assert!(dst.join("keep.txt").exists());
    }

    #[test]
    fn matches_by_name_not_kind() {
        let (_tmp, src, dst) = pair();
        fs::create_dir(src.join("same")).unwrap();
        fs::write(dst.join("same"), "file in replica").unwrap();

        let mut events: Vec<SyncEvent> = Vec::new();
        prune(&src, &dst, &mut events).unwrap();
        assert!(events.is_empty());
        assert!(dst.join("same").is_file());
    }

    #[test]
    fn empty_source_clears_replica_level() {
        let (_tmp, src, dst) = pair();
        fs::write(dst.join("a"), "a").unwrap();
        fs::write(dst.join("b"), "b").unwrap();

        let mut events: Vec<SyncEvent> = Vec::new();
        let report = prune(&src, &dst, &mut events).unwrap();
        assert_eq!(report.removed_files, 2);
        assert_eq!(fs::read_dir(&dst).unwrap().count(), 0);
    }

    #[test]
    fn missing_source_is_an_error_and_replica_untouched() {
        let (_tmp, src, dst) = pair();
        fs::write(dst.join("precious"), "p").unwrap();
        let mut events: Vec<SyncEvent> = Vec::new();
        assert!(prune(&src.join("gone"), &dst, &mut events).is_err());
        assert!(dst.join("precious").exists());
    }

    #[cfg(unix)]
    #[test]
    fn never_reads_content_of_what_it_removes() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, src, dst) = pair();
        let locked = dst.join("locked.bin");
        fs::write(&locked, "secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let mut events: Vec<SyncEvent> = Vec::new();
        let report = prune(&src, &dst, &mut events).unwrap();

        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(events, vec![SyncEvent::RemovedFile { path: locked.clone() }]);
        assert!(!locked.exists());
    }
}
