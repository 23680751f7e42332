//! Per-pass bookkeeping: counters, skipped items, and the context threaded
//! through the reconciler and the prune sweep.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use replica_core::SyncEvent;

use crate::error::SyncError;
use crate::sink::EventSink;

/// Which step of a pass failed for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Inspect,
    Digest,
    Copy,
    CreateDirectory,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::List => "list",
            Operation::Inspect => "inspect",
            Operation::Digest => "digest",
            Operation::Copy => "copy",
            Operation::CreateDirectory => "create directory",
            Operation::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// An item skipped for the current pass. It is retried on the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub operation: Operation,
    pub message: String,
}

/// Outcome of one pass (or one standalone reconcile / prune call).
#[derive(Debug, Clone)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub created_root: bool,
    pub copied: usize,
    pub created_dirs: usize,
    pub removed_files: usize,
    pub removed_dirs: usize,
    pub failures: Vec<ItemFailure>,
}

impl PassReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration: Duration::ZERO,
            created_root: false,
            copied: 0,
            created_dirs: 0,
            removed_files: 0,
            removed_dirs: 0,
            failures: Vec::new(),
        }
    }

    /// Number of events emitted during the pass.
    pub fn changes(&self) -> usize {
        usize::from(self.created_root)
            + self.copied
            + self.created_dirs
            + self.removed_files
            + self.removed_dirs
    }

    pub fn is_noop(&self) -> bool {
        self.changes() == 0 && self.failures.is_empty()
    }

    pub(crate) fn record(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::CreatedRoot { .. } => self.created_root = true,
            SyncEvent::Copied { .. } => self.copied += 1,
            SyncEvent::CreatedDirectory { .. } => self.created_dirs += 1,
            SyncEvent::RemovedFile { .. } => self.removed_files += 1,
            SyncEvent::RemovedDirectory { .. } => self.removed_dirs += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// PassContext
// ---------------------------------------------------------------------------

/// Shared state for a single walk: where events go and what has happened.
pub(crate) struct PassContext<'a> {
    sink: &'a mut dyn EventSink,
    pub report: PassReport,
}

impl<'a> PassContext<'a> {
    pub fn new(sink: &'a mut dyn EventSink) -> Self {
        Self {
            sink,
            report: PassReport::new(Utc::now()),
        }
    }

    pub fn emit(&mut self, event: SyncEvent) {
        self.report.record(&event);
        self.sink.emit(&event);
    }

    /// Record a skipped item and keep going.
    pub fn fail(&mut self, path: &Path, operation: Operation, err: SyncError) {
        tracing::warn!("skipping {} ({operation} failed): {err}", path.display());
        self.report.failures.push(ItemFailure {
            path: path.to_path_buf(),
            operation,
            message: err.to_string(),
        });
    }

    pub fn finish(mut self) -> PassReport {
        self.report.duration = (Utc::now() - self.report.started_at)
            .to_std()
            .unwrap_or_default();
        self.report
    }
}
