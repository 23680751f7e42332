//! Streaming content digests used for change detection.
//!
//! Files are read in fixed [`CHUNK_SIZE`] chunks and folded into a running
//! hasher, so memory use is bounded regardless of file size. Digests exist
//! only to notice changed content; they are not an integrity guarantee.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use replica_core::ChecksumValue;

use crate::error::{io_err, SyncError};

/// Bytes read per `read` call while hashing.
pub const CHUNK_SIZE: usize = 4096;

/// Pluggable change-detection strategy.
///
/// Source and replica files must be hashed by the same digester within a
/// pass, otherwise values are not comparable.
pub trait Digester: Send + Sync {
    /// Short algorithm name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Digest the full byte content of `path`.
    fn digest(&self, path: &Path) -> Result<ChecksumValue, SyncError>;
}

/// SHA-256, hex encoded. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digester;

impl Digester for Sha256Digester {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, path: &Path) -> Result<ChecksumValue, SyncError> {
        let mut h = Sha256::new();
        stream_chunks(path, |chunk| h.update(chunk))?;
        Ok(ChecksumValue(hex::encode(h.finalize())))
    }
}

/// BLAKE3, hex encoded. Faster on large trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Digester;

impl Digester for Blake3Digester {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn digest(&self, path: &Path) -> Result<ChecksumValue, SyncError> {
        let mut hasher = blake3::Hasher::new();
        stream_chunks(path, |chunk| {
            hasher.update(chunk);
        })?;
        Ok(ChecksumValue(hasher.finalize().to_hex().to_string()))
    }
}

/// Feed every chunk of `path` to `update`, in order.
fn stream_chunks(path: &Path, mut update: impl FnMut(&[u8])) -> Result<(), SyncError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(path, e)),
        };
        update(&buffer[..n]);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Algorithm selection
// ---------------------------------------------------------------------------

/// Digest algorithms selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    pub fn digester(self) -> Box<dyn Digester> {
        match self {
            DigestAlgorithm::Sha256 => Box::new(Sha256Digester),
            DigestAlgorithm::Blake3 => Box::new(Blake3Digester),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!(
                "unknown digest algorithm '{other}'; expected: sha256, blake3"
            )),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha256 => f.write_str("sha256"),
            DigestAlgorithm::Blake3 => f.write_str("blake3"),
        }
    }
}
