//! Replica core library — domain types, events, configuration errors.
//!
//! Public API surface:
//! - [`types`] — entry kinds, checksum newtype, [`SyncConfig`]
//! - [`event`] — [`SyncEvent`], the plain-text event log vocabulary
//! - [`error`] — [`ConfigError`]

pub mod error;
pub mod event;
pub mod types;

pub use error::ConfigError;
pub use event::SyncEvent;
pub use types::{ChecksumValue, DirectoryEntry, EntryKind, SyncConfig};
