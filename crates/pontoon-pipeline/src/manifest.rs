//! Dump artifact manifests
//!
//! A manifest describes one dump artifact: the ordered chunk list, the
//! total uncompressed length, and the aggregate checksum. It is created
//! `pending` in memory at run start, mutated only by its own run, and
//! becomes visible to readers only when the completed form is written
//! to the bridge - strictly after every chunk it references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pontoon_core::types::Compression;
use pontoon_core::{Error, Result};

/// Version of the manifest format.
pub const MANIFEST_VERSION: &str = "1.0.0";

/// Lifecycle status of a dump artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    /// Run in progress; never eligible for restore
    Pending,
    /// Every chunk landed durably; eligible for restore
    Complete,
    /// Run failed; kept for diagnostics only
    Failed,
}

impl std::fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestStatus::Pending => write!(f, "pending"),
            ManifestStatus::Complete => write!(f, "complete"),
            ManifestStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Descriptor for one stored chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    /// 0-based, gapless sequence number
    pub seq: u64,

    /// Uncompressed payload length in bytes
    pub len: u64,

    /// Stored (possibly compressed) length in bytes
    pub stored_len: u64,

    /// Hex SHA-256 over the stored bytes
    pub checksum: String,

    /// Bridge storage key
    pub key: String,
}

/// Complete description of one dump artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest format version
    pub version: String,

    /// Unique id for this run's artifact
    pub id: String,

    /// Source job that produced the artifact
    pub job: String,

    /// When the run started
    pub created_at: DateTime<Utc>,

    /// Lifecycle status
    pub status: ManifestStatus,

    /// Compression applied to chunk payloads
    pub compression: Compression,

    /// Ordered chunk descriptors
    pub chunks: Vec<ChunkDescriptor>,

    /// Total uncompressed length of the dump in bytes
    pub total_bytes: u64,

    /// Hex SHA-256 over the full uncompressed stream; set on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl Manifest {
    /// Create a pending manifest for a new dump run.
    pub fn new(job: impl Into<String>, compression: Compression) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            job: job.into(),
            created_at: Utc::now(),
            status: ManifestStatus::Pending,
            compression,
            chunks: Vec::new(),
            total_bytes: 0,
            checksum: None,
        }
    }

    /// The next chunk sequence number this run will assign.
    pub fn next_seq(&self) -> u64 {
        self.chunks.len() as u64
    }

    /// Append a chunk descriptor, accumulating the total length.
    pub fn push_chunk(&mut self, descriptor: ChunkDescriptor) {
        self.total_bytes += descriptor.len;
        self.chunks.push(descriptor);
    }

    /// Flip to `complete`, recording the aggregate stream checksum.
    pub fn complete(&mut self, checksum: String) {
        self.status = ManifestStatus::Complete;
        self.checksum = Some(checksum);
    }

    /// Flip to `failed`.
    pub fn fail(&mut self) {
        self.status = ManifestStatus::Failed;
    }

    /// Whether this artifact is eligible for restore.
    pub fn is_complete(&self) -> bool {
        self.status == ManifestStatus::Complete
    }

    /// Serializes the manifest to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes a manifest from JSON.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Validate the chunk sequence: 0-based, contiguous, no gaps or
    /// duplicates, and a consistent total length.
    pub fn validate_chunks(&self) -> Result<()> {
        for (index, chunk) in self.chunks.iter().enumerate() {
            if chunk.seq != index as u64 {
                return Err(Error::manifest_corrupt(
                    self.id.as_str(),
                    format!("expected sequence {index}, found {}", chunk.seq),
                ));
            }
        }

        let summed: u64 = self.chunks.iter().map(|c| c.len).sum();
        if summed != self.total_bytes {
            return Err(Error::manifest_corrupt(
                self.id.as_str(),
                format!(
                    "chunk lengths sum to {summed} but total_bytes is {}",
                    self.total_bytes
                ),
            ));
        }

        Ok(())
    }
}
