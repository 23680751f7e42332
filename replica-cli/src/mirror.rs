//! The mirror command: validate configuration, then run one pass or loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use replica_core::SyncConfig;
use replica_daemon::{init_tracing, start_blocking, SyncLoop};
use replica_sync::{DigestAlgorithm, LogFileSink};

/// Positional arguments plus the optional run-mode flags.
#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Folder to mirror from. Must already exist.
    #[arg(value_name = "source_folder")]
    pub source_folder: PathBuf,

    /// Folder kept identical to the source. Created if missing.
    #[arg(value_name = "replica_folder")]
    pub replica_folder: PathBuf,

    /// Seconds to wait between the end of one pass and the start of the next.
    #[arg(value_name = "sync_interval_seconds")]
    pub sync_interval_seconds: u64,

    /// File every mirror event is appended to (also echoed to stdout).
    #[arg(value_name = "log_file")]
    pub log_file: PathBuf,

    /// Run a single pass and exit.
    #[arg(long)]
    pub once: bool,

    /// Content digest used to detect changed files.
    #[arg(long, default_value_t = DigestAlgorithm::Sha256)]
    pub digest: DigestAlgorithm,
}

impl MirrorArgs {
    pub fn run(self) -> Result<()> {
        init_tracing();

        let config = SyncConfig::with_interval_secs(
            &self.source_folder,
            &self.replica_folder,
            &self.log_file,
            self.sync_interval_seconds,
        )
        .context("invalid configuration")?;

        let sink = LogFileSink::new(&config.log_file);
        let mut sync_loop = SyncLoop::new(config, self.digest.digester(), Box::new(sink));

        if self.once {
            sync_loop.run_once().context("mirror pass failed")?;
            return Ok(());
        }

        start_blocking(sync_loop).context("mirror loop exited with error")?;
        Ok(())
    }
}
