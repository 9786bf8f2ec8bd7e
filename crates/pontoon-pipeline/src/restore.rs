//! Restore pipeline
//!
//! Bridge → verify → bounded channel → destination. Every chunk is
//! re-checksummed against its descriptor before one byte of it is
//! decoded or forwarded, and the aggregate stream checksum is verified
//! at end of stream. A failed run re-runs from chunk 0 on the next
//! attempt; destination connectors are required to tolerate a full
//! reapply (see [`DestinationConnector`]).

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pontoon_bridge::BridgeStore;
use pontoon_codec::{ChunkCodec, StreamHasher};
use pontoon_connectors::DestinationConnector;
use pontoon_core::config::DestinationEntry;
use pontoon_core::retry::retry_with_policy;
use pontoon_core::types::RetryPolicy;
use pontoon_core::{Error, Result};

use crate::manifest::{ChunkDescriptor, Manifest};
use crate::{select, CHUNK_CHANNEL_CAPACITY};

/// Parameters for one restore run.
#[derive(Debug, Clone)]
pub struct RestoreSpec {
    /// Source job whose artifacts to restore
    pub job: String,

    /// Explicit manifest id; latest complete manifest when absent
    pub manifest_id: Option<String>,
}

impl From<&DestinationEntry> for RestoreSpec {
    fn from(entry: &DestinationEntry) -> Self {
        Self {
            job: entry.source_job.clone(),
            manifest_id: None,
        }
    }
}

/// Outcome of a successful restore run.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    /// Manifest that was applied
    pub manifest_id: String,

    /// Number of chunks streamed
    pub chunks: u64,

    /// Uncompressed bytes written to the destination
    pub bytes_written: u64,
}

/// Streams a stored artifact into a destination connector.
pub struct RestorePipeline {
    bridge: Arc<dyn BridgeStore>,
    retry: RetryPolicy,
}

impl RestorePipeline {
    /// Create a pipeline over the given bridge.
    pub fn new(bridge: Arc<dyn BridgeStore>, retry: RetryPolicy) -> Self {
        Self { bridge, retry }
    }

    /// Run one restore to completion.
    pub async fn run(
        &self,
        spec: &RestoreSpec,
        mut destination: Box<dyn DestinationConnector>,
        cancel: CancellationToken,
    ) -> Result<RestoreReport> {
        let start = Instant::now();

        let manifest = self.select_manifest(spec).await?;
        manifest.validate_chunks()?;

        info!(
            "Starting restore of manifest {} for job {} ({} chunks, {} bytes)",
            manifest.id,
            manifest.job,
            manifest.chunks.len(),
            manifest.total_bytes
        );

        destination.open().await?;

        match self
            .stream(&manifest, destination.as_mut(), &cancel)
            .await
        {
            Ok(bytes_written) => {
                destination.close().await?;
                info!(
                    "Restore of manifest {} complete: {} bytes in {:?}",
                    manifest.id,
                    bytes_written,
                    start.elapsed()
                );
                Ok(RestoreReport {
                    manifest_id: manifest.id.clone(),
                    chunks: manifest.chunks.len() as u64,
                    bytes_written,
                })
            }
            Err(err) => {
                warn!("Restore of manifest {} failed: {err}", manifest.id);
                // Tear the connector down without a graceful close so
                // the tool dies mid-transaction instead of committing
                // whatever prefix it was fed.
                drop(destination);
                Err(err)
            }
        }
    }

    async fn select_manifest(&self, spec: &RestoreSpec) -> Result<Manifest> {
        match &spec.manifest_id {
            Some(id) => {
                let manifest = select::load(self.bridge.as_ref(), &spec.job, id).await?;
                if !manifest.is_complete() {
                    return Err(Error::invalid_config(format!(
                        "manifest {id} has status {}; only complete manifests are restorable",
                        manifest.status
                    )));
                }
                Ok(manifest)
            }
            None => select::latest_complete(self.bridge.as_ref(), &spec.job)
                .await?
                .ok_or_else(|| Error::no_manifest(spec.job.as_str())),
        }
    }

    async fn stream(
        &self,
        manifest: &Manifest,
        destination: &mut dyn DestinationConnector,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let codec = ChunkCodec::new(manifest.compression);
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(CHUNK_CHANNEL_CAPACITY);

        let fetch_token = cancel.child_token();
        let fetcher = tokio::spawn(fetch(
            self.bridge.clone(),
            self.retry.clone(),
            manifest.id.clone(),
            manifest.chunks.clone(),
            codec,
            tx,
            fetch_token.clone(),
        ));

        let mut hasher = StreamHasher::new();
        let write_result: Result<()> = async {
            loop {
                let payload = tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    received = rx.recv() => match received {
                        Some(payload) => payload,
                        None => break,
                    },
                };
                hasher.update(&payload);
                destination.write(&payload).await?;
            }
            Ok(())
        }
        .await;

        match write_result {
            Ok(()) => {
                fetcher
                    .await
                    .map_err(|e| Error::download("chunks", format!("fetch task failed: {e}")))??;
            }
            Err(err) => {
                fetch_token.cancel();
                let _ = fetcher.await;
                return Err(err);
            }
        }

        // End-to-end verification of the reassembled stream against
        // what the dump side recorded.
        let bytes_written = hasher.bytes();
        if bytes_written != manifest.total_bytes {
            return Err(Error::manifest_corrupt(
                manifest.id.as_str(),
                format!(
                    "reassembled {bytes_written} bytes but manifest records {}",
                    manifest.total_bytes
                ),
            ));
        }
        if let Some(expected) = &manifest.checksum {
            let computed = hasher.finalize_hex();
            if computed != *expected {
                return Err(Error::manifest_corrupt(
                    manifest.id.as_str(),
                    format!("aggregate checksum mismatch: expected {expected}, computed {computed}"),
                ));
            }
        }

        Ok(bytes_written)
    }
}

/// Fetch stage: download, verify, and decode each chunk in strict
/// sequence order. Verification happens here, before the payload is
/// handed to the writer, so the destination never sees a byte of a
/// corrupted chunk - or of anything after it.
async fn fetch(
    bridge: Arc<dyn BridgeStore>,
    retry: RetryPolicy,
    manifest_id: String,
    chunks: Vec<ChunkDescriptor>,
    codec: ChunkCodec,
    tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) -> Result<()> {
    for descriptor in &chunks {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let stored = retry_with_policy(&retry, "chunk download", || {
            let bridge = bridge.clone();
            let key = descriptor.key.clone();
            async move { bridge.get(&key).await }
        })
        .await?;

        let payload = codec.decode(descriptor.seq, &descriptor.checksum, &stored)?;
        if payload.len() as u64 != descriptor.len {
            return Err(Error::manifest_corrupt(
                manifest_id.as_str(),
                format!(
                    "chunk {} decoded to {} bytes but descriptor records {}",
                    descriptor.seq,
                    payload.len(),
                    descriptor.len
                ),
            ));
        }

        debug!(
            "Verified chunk {} of manifest {manifest_id} ({} bytes)",
            descriptor.seq, descriptor.len
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            sent = tx.send(payload) => {
                if sent.is_err() {
                    return Err(Error::Cancelled);
                }
            }
        }
    }

    Ok(())
}
