//! Chunk encode/decode

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;

use pontoon_core::types::Compression;
use pontoon_core::{Error, Result};

use crate::checksum::sha256_hex;

/// Default gzip level (6 = balanced speed/ratio).
const GZIP_LEVEL: u32 = 6;

/// One encoded chunk, ready for upload.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// 0-based sequence number within the manifest
    pub seq: u64,

    /// Uncompressed payload length in bytes
    pub len: u64,

    /// Bytes as they will be stored (possibly compressed)
    pub stored: Vec<u8>,

    /// Hex SHA-256 over the stored bytes
    pub checksum: String,
}

impl EncodedChunk {
    /// Stored length in bytes.
    pub fn stored_len(&self) -> u64 {
        self.stored.len() as u64
    }
}

/// Encodes payload slices into stored chunks and back.
#[derive(Debug, Clone, Copy)]
pub struct ChunkCodec {
    compression: Compression,
}

impl ChunkCodec {
    /// Create a codec with the given payload compression.
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }

    /// The compression this codec applies.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Encode one payload slice as the chunk with sequence number `seq`.
    pub fn encode(&self, seq: u64, payload: &[u8]) -> Result<EncodedChunk> {
        let stored = match self.compression {
            Compression::None => payload.to_vec(),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(
                    Vec::with_capacity(payload.len() / 2 + 64),
                    GzLevel::new(GZIP_LEVEL),
                );
                encoder.write_all(payload)?;
                encoder.finish()?
            }
        };

        let checksum = sha256_hex(&stored);

        Ok(EncodedChunk {
            seq,
            len: payload.len() as u64,
            stored,
            checksum,
        })
    }

    /// Verify stored bytes against the expected checksum, then decode
    /// them back into the original payload.
    ///
    /// Verification happens before any decoding so a corrupted object
    /// never produces output.
    pub fn decode(&self, seq: u64, expected_checksum: &str, stored: &[u8]) -> Result<Vec<u8>> {
        let computed = sha256_hex(stored);
        if computed != expected_checksum {
            return Err(Error::integrity(seq, expected_checksum, computed));
        }

        match self.compression {
            Compression::None => Ok(stored.to_vec()),
            Compression::Gzip => {
                let mut decoder = GzDecoder::new(stored);
                let mut payload = Vec::new();
                decoder.read_to_end(&mut payload).map_err(|e| {
                    Error::manifest_corrupt(
                        seq.to_string(),
                        format!("gzip decoding of chunk {seq} failed: {e}"),
                    )
                })?;
                Ok(payload)
            }
        }
    }
}
