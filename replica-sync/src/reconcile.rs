//! Tree reconciler — copy new and changed files, create missing directories,
//! and prune each level once its children are done.
//!
//! The walk is depth-first in name order. It runs on an explicit stack of
//! frames rather than recursion, so nesting depth is bounded by memory, not
//! by the call stack. A frame is pruned when its last entry is processed,
//! which keeps every level "copy, then prune" before control returns to the
//! parent frame.
//!
//! Type mismatches are resolved as replace: a replica entry whose kind
//! differs from the source is removed before the source is mirrored.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use replica_core::{DirectoryEntry, EntryKind, SyncEvent};

use crate::checksum::Digester;
use crate::error::SyncError;
use crate::fs_ops;
use crate::prune::prune_level;
use crate::report::{Operation, PassContext, PassReport};
use crate::sink::EventSink;

/// One directory level awaiting (or in the middle of) processing.
struct Frame {
    source_dir: PathBuf,
    replica_dir: PathBuf,
    pending: std::vec::IntoIter<DirectoryEntry>,
    /// Source names mirrored so far; the prune sweep keeps exactly these.
    mirrored: HashSet<OsString>,
}

impl Frame {
    fn new(source_dir: PathBuf, replica_dir: PathBuf, entries: Vec<DirectoryEntry>) -> Self {
        Self {
            source_dir,
            replica_dir,
            pending: entries.into_iter(),
            mirrored: HashSet::new(),
        }
    }
}

/// Mirror `source_dir` into `replica_dir`, recursively.
///
/// Both must already exist as directories. Failures below the roots are
/// recorded in the returned report and skipped; only root problems are
/// returned as errors.
pub fn reconcile(
    source_dir: &Path,
    replica_dir: &Path,
    digester: &dyn Digester,
    sink: &mut dyn EventSink,
) -> Result<PassReport, SyncError> {
    check_root(source_dir, SyncError::SourceMissing {
        path: source_dir.to_path_buf(),
    })?;
    check_root(replica_dir, SyncError::ReplicaMissing {
        path: replica_dir.to_path_buf(),
    })?;

    let root_entries = fs_ops::list_dir(source_dir)?;
    let mut ctx = PassContext::new(sink);
    let mut stack = vec![Frame::new(
        source_dir.to_path_buf(),
        replica_dir.to_path_buf(),
        root_entries,
    )];

    loop {
        let Some(frame) = stack.last_mut() else {
            break;
        };
        let Some(entry) = frame.pending.next() else {
            if let Some(done) = stack.pop() {
                tracing::debug!("pruning {}", done.replica_dir.display());
                prune_level(&mut ctx, &done.replica_dir, &done.mirrored);
            }
            continue;
        };

        let replica_path = frame.replica_dir.join(&entry.name);
        let descend = match entry.kind {
            EntryKind::File => {
                frame.mirrored.insert(entry.name);
                sync_file(&mut ctx, digester, &entry.path, &replica_path);
                None
            }
            EntryKind::Directory => {
                frame.mirrored.insert(entry.name);
                if ensure_replica_dir(&mut ctx, &replica_path) {
                    open_frame(&mut ctx, entry.path, replica_path)
                } else {
                    None
                }
            }
            EntryKind::Other => {
                tracing::debug!(
                    "skipping special entry {} (neither file nor directory)",
                    entry.path.display()
                );
                None
            }
        };

        if let Some(child) = descend {
            stack.push(child);
        }
    }

    Ok(ctx.finish())
}

/// `missing` if `path` is absent, `NotADirectory` if it is something else.
fn check_root(path: &Path, missing: SyncError) -> Result<(), SyncError> {
    match fs_ops::entry_kind(path)? {
        None => Err(missing),
        Some(EntryKind::Directory) => Ok(()),
        // A symlinked root is followed: the user named it explicitly.
        Some(EntryKind::Other) if path.is_dir() => Ok(()),
        Some(_) => Err(SyncError::NotADirectory {
            path: path.to_path_buf(),
        }),
    }
}

/// List a source subdirectory. On failure the subtree is left as is for
/// this pass: without a listing there is nothing to prune against.
fn open_frame(ctx: &mut PassContext<'_>, source_dir: PathBuf, replica_dir: PathBuf) -> Option<Frame> {
    match fs_ops::list_dir(&source_dir) {
        Ok(entries) => Some(Frame::new(source_dir, replica_dir, entries)),
        Err(err) => {
            ctx.fail(&source_dir, Operation::List, err);
            None
        }
    }
}

/// Bring one replica file in line with its source. Unchanged files emit
/// nothing.
fn sync_file(ctx: &mut PassContext<'_>, digester: &dyn Digester, source: &Path, replica: &Path) {
    let existing = match fs_ops::entry_kind(replica) {
        Ok(kind) => kind,
        Err(err) => return ctx.fail(replica, Operation::Inspect, err),
    };

    match existing {
        None => {}
        Some(EntryKind::File) => match content_differs(ctx, digester, source, replica) {
            Some(true) => {}
            Some(false) => {
                tracing::debug!("unchanged: {}", replica.display());
                return;
            }
            None => return,
        },
        Some(kind) => {
            if !replace(ctx, replica, kind) {
                return;
            }
        }
    }

    match fs_ops::copy_file(source, replica) {
        Ok(()) => ctx.emit(SyncEvent::Copied {
            source: source.to_path_buf(),
            replica: replica.to_path_buf(),
        }),
        Err(err) => ctx.fail(source, Operation::Copy, err),
    }
}

/// `Some(true)` when the digests differ, `None` when either side could not
/// be hashed (already recorded as a failure).
fn content_differs(
    ctx: &mut PassContext<'_>,
    digester: &dyn Digester,
    source: &Path,
    replica: &Path,
) -> Option<bool> {
    let source_sum = match digester.digest(source) {
        Ok(sum) => sum,
        Err(err) => {
            ctx.fail(source, Operation::Digest, err);
            return None;
        }
    };
    let replica_sum = match digester.digest(replica) {
        Ok(sum) => sum,
        Err(err) => {
            ctx.fail(replica, Operation::Digest, err);
            return None;
        }
    };
    Some(source_sum != replica_sum)
}

/// Make sure `replica` is a directory, creating or replacing as needed.
/// Returns whether the walk may descend into it.
fn ensure_replica_dir(ctx: &mut PassContext<'_>, replica: &Path) -> bool {
    match fs_ops::entry_kind(replica) {
        Ok(Some(EntryKind::Directory)) => return true,
        Ok(Some(kind)) => {
            if !replace(ctx, replica, kind) {
                return false;
            }
        }
        Ok(None) => {}
        Err(err) => {
            ctx.fail(replica, Operation::Inspect, err);
            return false;
        }
    }

    match fs_ops::create_dir(replica) {
        Ok(()) => {
            ctx.emit(SyncEvent::CreatedDirectory {
                path: replica.to_path_buf(),
            });
            true
        }
        Err(err) => {
            ctx.fail(replica, Operation::CreateDirectory, err);
            false
        }
    }
}

/// Remove a replica entry of the wrong kind. Returns whether it is gone.
fn replace(ctx: &mut PassContext<'_>, replica: &Path, kind: EntryKind) -> bool {
    match fs_ops::remove_entry(replica, kind) {
        Ok(event) => {
            ctx.emit(event);
            true
        }
        Err(err) => {
            ctx.fail(replica, Operation::Remove, err);
            false
        }
    }
}
