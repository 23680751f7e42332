//! Replica — one-way, periodic directory mirror.
//!
//! # Usage
//!
//! ```text
//! replica <source_folder> <replica_folder> <sync_interval_seconds> <log_file>
//!         [--once] [--digest sha256|blake3]
//! ```

mod mirror;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;

use mirror::MirrorArgs;

/// Printed to stdout whenever the arguments cannot be parsed.
const USAGE: &str =
    "Usage: replica <source_folder> <replica_folder> <sync_interval_seconds> <log_file>";

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "replica",
    version,
    about = "Mirror a source folder into a replica folder on a fixed interval",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    mirror: MirrorArgs,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            println!("{USAGE}");
            let _ = err.print();
            std::process::exit(1);
        }
    };
    cli.mirror.run()
}
