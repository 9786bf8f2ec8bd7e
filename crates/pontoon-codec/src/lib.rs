//! Chunk codec
//!
//! Splits a dump's byte stream into fixed-upper-bound chunks and turns
//! them back into the original stream. Each chunk is independently
//! checksummed over its stored form (post-compression), so the restore
//! side can verify exactly what it downloaded before decoding a single
//! byte. An aggregate checksum over the uncompressed stream travels in
//! the manifest for end-to-end verification.

mod checksum;
mod codec;

pub use checksum::{sha256_hex, StreamHasher};
pub use codec::{ChunkCodec, EncodedChunk};
