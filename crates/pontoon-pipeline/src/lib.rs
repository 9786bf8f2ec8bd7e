//! Dump and restore pipelines
//!
//! The dump pipeline turns a live, unbounded source stream into a
//! durable artifact in the bridge: bounded chunks, each checksummed and
//! uploaded in sequence order, described by a manifest whose single
//! final write is what makes the artifact visible. The restore pipeline
//! is the mirror image: select a complete manifest, fetch and verify
//! each chunk before one byte of it reaches the destination, and stream
//! the reassembled dump into a destination connector.
//!
//! Both pipelines run their stages as producer/consumer pairs joined by
//! a bounded channel, so a slow bridge or destination stalls upstream
//! reads instead of growing memory.

pub mod dump;
pub mod manifest;
pub mod restore;
pub mod select;

pub use dump::{DumpPipeline, DumpSpec};
pub use manifest::{ChunkDescriptor, Manifest, ManifestStatus, MANIFEST_VERSION};
pub use restore::{RestorePipeline, RestoreReport, RestoreSpec};

/// Capacity of the chunk hand-off channel between pipeline stages.
///
/// Together with the single in-flight read buffer this bounds how many
/// chunks a run ever holds in memory, regardless of dump size.
pub const CHUNK_CHANNEL_CAPACITY: usize = 2;
