//! Single-pass entry point shared by the CLI and the daemon loop.

use std::io::ErrorKind;
use std::path::Path;

use replica_core::{SyncConfig, SyncEvent};

use crate::checksum::Digester;
use crate::error::{io_err, SyncError};
use crate::reconcile::reconcile;
use crate::report::PassReport;
use crate::sink::EventSink;

/// Create the replica root (and its parents) if it is missing.
///
/// Returns `true` and emits a `Created <path> folder` event when something
/// was created.
pub fn ensure_replica_root(replica_root: &Path, sink: &mut dyn EventSink) -> Result<bool, SyncError> {
    match std::fs::metadata(replica_root) {
        Ok(meta) if meta.is_dir() => Ok(false),
        Ok(_) => Err(SyncError::NotADirectory {
            path: replica_root.to_path_buf(),
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            std::fs::create_dir_all(replica_root).map_err(|e| io_err(replica_root, e))?;
            sink.emit(&SyncEvent::CreatedRoot {
                path: replica_root.to_path_buf(),
            });
            Ok(true)
        }
        Err(err) => Err(io_err(replica_root, err)),
    }
}

/// Run one full pass: ensure the replica root, then reconcile the trees.
///
/// The replica root check runs every pass, so a root deleted between passes
/// is recreated instead of failing forever. On an unchanged tree it emits
/// nothing.
pub fn run_pass(
    config: &SyncConfig,
    digester: &dyn Digester,
    sink: &mut dyn EventSink,
) -> Result<PassReport, SyncError> {
    let created_root = ensure_replica_root(&config.replica_root, sink)?;
    let mut report = reconcile(&config.source_root, &config.replica_root, digester, sink)?;
    report.created_root = created_root;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::checksum::Sha256Digester;

    use super::*;

    fn config(tmp: &TempDir) -> SyncConfig {
        let source = tmp.path().join("Source");
        fs::create_dir_all(&source).expect("mkdir");
        SyncConfig::new(
            source,
            tmp.path().join("nested").join("Replica"),
            tmp.path().join("sync.log"),
            Duration::from_secs(1),
        )
        .expect("config")
    }

    #[test]
    fn first_pass_creates_missing_replica_root_with_parents() {
        let tmp = TempDir::new().expect("tmp");
        let cfg = config(&tmp);
        let mut events: Vec<SyncEvent> = Vec::new();

        let report = run_pass(&cfg, &Sha256Digester, &mut events).expect("pass");

        assert!(report.created_root);
        assert!(cfg.replica_root.is_dir());
        assert_eq!(
            events,
            vec![SyncEvent::CreatedRoot {
                path: cfg.replica_root.clone()
            }]
        );
    }

    #[test]
    fn existing_replica_root_emits_nothing() {
        let tmp = TempDir::new().expect("tmp");
        let cfg = config(&tmp);
        fs::create_dir_all(&cfg.replica_root).expect("mkdir");
        let mut events: Vec<SyncEvent> = Vec::new();

        let created = ensure_replica_root(&cfg.replica_root, &mut events).expect("ensure");
        assert!(!created);
        assert!(events.is_empty());
    }

    #[test]
    fn vanished_source_fails_the_pass() {
        let tmp = TempDir::new().expect("tmp");
        let cfg = config(&tmp);
        fs::remove_dir(&cfg.source_root).expect("rmdir");
        let mut events: Vec<SyncEvent> = Vec::new();

        let err = run_pass(&cfg, &Sha256Digester, &mut events).unwrap_err();
        assert!(matches!(err, SyncError::SourceMissing { .. }), "got {err:?}");
    }
}
