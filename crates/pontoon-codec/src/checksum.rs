//! SHA-256 checksum helpers

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Incremental SHA-256 over a byte stream.
///
/// The dump side feeds every uncompressed payload slice through one of
/// these to produce the manifest's aggregate checksum; the restore side
/// mirrors it to verify end-to-end byte identity.
#[derive(Debug, Default)]
pub struct StreamHasher {
    hasher: Sha256,
    bytes: u64,
}

impl StreamHasher {
    /// Create a new hasher with zero bytes consumed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a slice into the running hash.
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.bytes += bytes.len() as u64;
    }

    /// Total bytes consumed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Consume the hasher, returning the hex digest.
    pub fn finalize_hex(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}
