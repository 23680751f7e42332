//! # replica-sync
//!
//! One-way mirroring of a source tree into a replica tree.
//!
//! Call [`run_pass`] for a full pass (replica root check plus reconcile), or
//! use [`reconcile`] and [`prune`] directly on a pair of directories. Content
//! changes are detected through a pluggable [`Digester`].

pub mod checksum;
pub mod error;
pub mod fs_ops;
pub mod pipeline;
pub mod prune;
pub mod reconcile;
pub mod report;
pub mod sink;

pub use checksum::{Blake3Digester, DigestAlgorithm, Digester, Sha256Digester};
pub use error::SyncError;
pub use pipeline::{ensure_replica_root, run_pass};
pub use prune::prune;
pub use reconcile::reconcile;
pub use report::{ItemFailure, Operation, PassReport};
pub use sink::{EventSink, LogFileSink};
