//! Bridge store abstraction
//!
//! The bridge is the durable object store decoupling the dump side from
//! the restore side. Pipelines only ever see the [`BridgeStore`] trait;
//! concrete stores are selected from configuration: S3 (and
//! S3-compatible services), a local filesystem directory, or an
//! in-process memory store for tests.
//!
//! The contract the pipelines rely on: `put` is all-or-nothing from a
//! reader's perspective; a partially written object is never observable
//! through `get`. No cross-key transactions exist; whole-artifact
//! atomicity is manufactured by writing the manifest object strictly
//! after every chunk it references.

use std::sync::Arc;

use async_trait::async_trait;

use pontoon_core::config::BridgeConfig;
use pontoon_core::Result;

pub mod keys;

mod fs;
mod memory;
mod s3;

pub use fs::FsBridge;
pub use memory::MemoryBridge;
pub use s3::S3Bridge;

/// Durable key/value object store with per-object atomicity.
///
/// Objects are bounded in size (one chunk or one manifest each), which
/// is what keeps whole-object `put`/`get` within the pipeline's memory
/// bound.
#[async_trait]
pub trait BridgeStore: Send + Sync {
    /// Store an object. All-or-nothing: readers observe either the
    /// complete object or nothing at all.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Fetch an object's bytes. Missing keys surface as
    /// [`Error::NotFound`](pontoon_core::Error::NotFound).
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// List keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Whether an object exists.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Construct a bridge store from configuration.
pub async fn from_config(config: &BridgeConfig) -> Result<Arc<dyn BridgeStore>> {
    match config {
        BridgeConfig::S3(s3) => Ok(Arc::new(S3Bridge::new(s3).await?)),
        BridgeConfig::Fs(fs) => Ok(Arc::new(FsBridge::new(fs.root.clone())?)),
        BridgeConfig::Memory => Ok(Arc::new(MemoryBridge::new())),
    }
}
