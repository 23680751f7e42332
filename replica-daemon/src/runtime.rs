use tokio::sync::{broadcast, watch};

use replica_core::SyncConfig;
use replica_sync::{run_pass, Digester, EventSink, PassReport};

use crate::error::{io_err, DaemonError};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Sleeping between passes.
    Idle,
    /// Inside a reconcile pass.
    Mirroring,
}

/// Totals reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub passes: u64,
    pub failed_passes: u64,
}

/// Periodic mirror: `IDLE → MIRRORING → IDLE`, forever or until shutdown.
///
/// Passes are strictly sequential. The wait between two passes is the full
/// interval measured from the end of the previous pass, so a slow pass
/// delays the next one rather than causing a burst.
pub struct SyncLoop {
    config: SyncConfig,
    digester: Box<dyn Digester>,
    sink: Box<dyn EventSink + Send>,
    state_tx: watch::Sender<LoopState>,
    summary: LoopSummary,
}

impl SyncLoop {
    pub fn new(
        config: SyncConfig,
        digester: Box<dyn Digester>,
        sink: Box<dyn EventSink + Send>,
    ) -> Self {
        let (state_tx, _) = watch::channel(LoopState::Idle);
        Self {
            config,
            digester,
            sink,
            state_tx,
            summary: LoopSummary::default(),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }

    /// Run exactly one pass on the current thread.
    pub fn run_once(&mut self) -> Result<PassReport, DaemonError> {
        self.set_state(LoopState::Mirroring);
        let result = self.pass();
        self.set_state(LoopState::Idle);
        Ok(result?)
    }

    /// Loop until `shutdown` fires (or its sender is dropped).
    ///
    /// Shutdown is only observed while idle; an in-flight pass always runs
    /// to completion. A pass that fails at the roots is logged and retried
    /// after the next interval.
    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<LoopSummary, DaemonError> {
        let interval = self.config.interval;
        tracing::info!(
            source = %self.config.source_root.display(),
            replica = %self.config.replica_root.display(),
            interval_secs = interval.as_secs(),
            digest = self.digester.name(),
            "mirror loop starting",
        );

        loop {
            self.set_state(LoopState::Mirroring);
            let (this, result) = tokio::task::spawn_blocking(move || {
                let result = self.pass();
                (self, result)
            })
            .await
            .map_err(|err| DaemonError::Task(format!("mirror pass join error: {err}")))?;
            self = this;
            if let Err(err) = result {
                tracing::error!(error = %err, "mirror pass failed; retrying next interval");
            }
            self.set_state(LoopState::Idle);

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        tracing::info!(
            passes = self.summary.passes,
            failed_passes = self.summary.failed_passes,
            "mirror loop stopped",
        );
        Ok(self.summary)
    }

    fn pass(&mut self) -> Result<PassReport, replica_sync::SyncError> {
        self.summary.passes += 1;
        let pass = self.summary.passes;
        match run_pass(&self.config, self.digester.as_ref(), self.sink.as_mut()) {
            Ok(report) => {
                log_report(pass, &report);
                Ok(report)
            }
            Err(err) => {
                self.summary.failed_passes += 1;
                Err(err)
            }
        }
    }

    fn set_state(&self, state: LoopState) {
        tracing::debug!(?state, "mirror loop state");
        self.state_tx.send_replace(state);
    }
}

fn log_report(pass: u64, report: &PassReport) {
    for failure in &report.failures {
        tracing::warn!(
            pass,
            path = %failure.path.display(),
            operation = %failure.operation,
            error = %failure.message,
            "item skipped this pass",
        );
    }
    if report.is_noop() {
        tracing::debug!(pass, duration_ms = report.duration.as_millis(), "replica up to date");
        return;
    }
    tracing::info!(
        pass,
        copied = report.copied,
        created_dirs = report.created_dirs,
        removed_files = report.removed_files,
        removed_dirs = report.removed_dirs,
        skipped = report.failures.len(),
        duration_ms = report.duration.as_millis(),
        "mirror pass completed",
    );
}

/// Run the loop on a single-threaded runtime until ctrl-c.
pub fn start_blocking(sync_loop: SyncLoop) -> Result<LoopSummary, DaemonError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received ctrl-c, stopping after the current pass");
                    let _ = shutdown_tx.send(());
                }
                Err(err) => {
                    tracing::error!(error = %err, "ctrl-c handler failed");
                    // Keep the sender alive so the loop is not stopped by a drop.
                    std::future::pending::<()>().await;
                }
            }
        });

        let summary = sync_loop.run(shutdown_rx).await;
        signal_handle.abort();
        summary
    })
}

/// Diagnostics go to stderr so stdout carries only the event log.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use replica_core::SyncEvent;
    use replica_sync::Sha256Digester;
    use tempfile::TempDir;

    const TICK: Duration = Duration::from_millis(20);

    #[derive(Clone, Default)]
    struct SharedSink {
        events: Arc<Mutex<Vec<SyncEvent>>>,
        states_seen: Arc<Mutex<Vec<LoopState>>>,
        state_rx: Arc<Mutex<Option<watch::Receiver<LoopState>>>>,
    }

    impl EventSink for SharedSink {
        fn emit(&mut self, event: &SyncEvent) {
            self.events.lock().unwrap().push(event.clone());
            if let Some(rx) = self.state_rx.lock().unwrap().as_ref() {
                self.states_seen.lock().unwrap().push(*rx.borrow());
            }
        }
    }

    fn setup(interval: Duration) -> (TempDir, SyncLoop, SharedSink) {
        let tmp = TempDir::new().expect("tmp");
        let source = tmp.path().join("Source");
        fs::create_dir_all(source.join("sub")).expect("mkdir");
        fs::write(source.join("a.txt"), "hello").expect("write");
        let config = SyncConfig::new(
            source,
            tmp.path().join("Replica"),
            tmp.path().join("sync.log"),
            interval,
        )
        .expect("config");
        let sink = SharedSink::default();
        let sync_loop = SyncLoop::new(config, Box::new(Sha256Digester), Box::new(sink.clone()));
        (tmp, sync_loop, sink)
    }

    #[test]
    fn run_once_mirrors_and_returns_to_idle() {
        let (tmp, mut sync_loop, sink) = setup(Duration::from_secs(60));
        let state = sync_loop.subscribe_state();
        *sink.state_rx.lock().unwrap() = Some(sync_loop.subscribe_state());

        let report = sync_loop.run_once().expect("pass");

        assert!(report.created_root);
        assert_eq!(report.copied, 1);
        assert_eq!(report.created_dirs, 1);
        assert!(tmp.path().join("Replica").join("a.txt").is_file());
        assert_eq!(*state.borrow(), LoopState::Idle);
        let seen = sink.states_seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(
            seen.iter().all(|s| *s == LoopState::Mirroring),
            "events are only emitted while mirroring"
        );
    }

    #[test]
    fn run_once_surfaces_root_errors() {
        let (tmp, mut sync_loop, _sink) = setup(Duration::from_secs(60));
        fs::remove_dir_all(tmp.path().join("Source")).expect("rm");

        let err = sync_loop.run_once().unwrap_err();
        assert!(matches!(err, DaemonError::Sync(_)), "got {err:?}");
        assert_eq!(*sync_loop.subscribe_state().borrow(), LoopState::Idle);
    }

    #[tokio::test]
    async fn loop_repeats_until_shutdown() {
        let (_tmp, sync_loop, _sink) = setup(TICK);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(sync_loop.run(shutdown_rx));
        tokio::time::sleep(TICK * 10).await;
        shutdown_tx.send(()).expect("send shutdown");

        let summary = handle.await.expect("join").expect("loop");
        assert!(summary.passes >= 2, "expected several passes, got {summary:?}");
        assert_eq!(summary.failed_passes, 0);
    }

    #[tokio::test]
    async fn later_passes_pick_up_source_changes() {
        let (tmp, sync_loop, sink) = setup(TICK);
        let mut state = sync_loop.subscribe_state();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(sync_loop.run(shutdown_rx));

        // Wait for the first pass to finish.
        state
            .wait_for(|s| *s == LoopState::Mirroring)
            .await
            .expect("state channel");
        state
            .wait_for(|s| *s == LoopState::Idle)
            .await
            .expect("state channel");

        fs::write(tmp.path().join("Source").join("late.txt"), "late").expect("write");
        fs::remove_file(tmp.path().join("Source").join("a.txt")).expect("rm");
        tokio::time::sleep(TICK * 10).await;
        shutdown_tx.send(()).expect("send shutdown");
        handle.await.expect("join").expect("loop");

        let replica = tmp.path().join("Replica");
        assert_eq!(fs::read_to_string(replica.join("late.txt")).expect("read"), "late");
        assert!(!replica.join("a.txt").exists());

        let events = sink.events.lock().unwrap();
        let copies_of_late = events
            .iter()
            .filter(|e| e.to_string().contains("late.txt"))
            .count();
        assert_eq!(copies_of_late, 1, "an unchanged file is never recopied");
    }

    #[tokio::test]
    async fn failed_pass_does_not_stop_the_loop() {
        let (tmp, sync_loop, _sink) = setup(TICK);
        fs::remove_dir_all(tmp.path().join("Source")).expect("rm");
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(sync_loop.run(shutdown_rx));
        tokio::time::sleep(TICK * 5).await;
        shutdown_tx.send(()).expect("send shutdown");

        let summary = handle.await.expect("join").expect("loop");
        assert!(summary.passes >= 2);
        assert_eq!(summary.passes, summary.failed_passes);
    }
}
