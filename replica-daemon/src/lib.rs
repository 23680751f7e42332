//! Mirror loop runtime: one reconcile pass per interval until shutdown.

mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{init_tracing, start_blocking, LoopState, LoopSummary, SyncLoop};
