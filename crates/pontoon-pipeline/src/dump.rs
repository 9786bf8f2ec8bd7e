//! Dump pipeline
//!
//! Source → chunk codec → bounded channel → bridge upload. The source
//! is pulled one chunk-sized slice at a time and never buffered in
//! full; the channel capacity bounds how many encoded chunks exist at
//! once, so a slow bridge stalls source reads. The manifest is written
//! last, only after every chunk upload succeeded - that single write is
//! what makes the artifact visible.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pontoon_bridge::{keys, BridgeStore};
use pontoon_codec::{ChunkCodec, EncodedChunk, StreamHasher};
use pontoon_connectors::SourceConnector;
use pontoon_core::config::SourceEntry;
use pontoon_core::retry::retry_with_policy;
use pontoon_core::types::{Compression, RetryPolicy};
use pontoon_core::{Error, Result};

use crate::manifest::{ChunkDescriptor, Manifest};
use crate::CHUNK_CHANNEL_CAPACITY;

/// Parameters for one dump run.
#[derive(Debug, Clone)]
pub struct DumpSpec {
    /// Source job name; owns the manifest namespace in the bridge
    pub job: String,

    /// Upper bound in bytes for a single chunk
    pub chunk_size: usize,

    /// Chunk payload compression
    pub compression: Compression,
}

impl From<&SourceEntry> for DumpSpec {
    fn from(entry: &SourceEntry) -> Self {
        Self {
            job: entry.name.clone(),
            chunk_size: entry.chunk_size,
            compression: entry.compression,
        }
    }
}

/// Drives one source connector's dump into the bridge.
pub struct DumpPipeline {
    bridge: Arc<dyn BridgeStore>,
    retry: RetryPolicy,
}

impl DumpPipeline {
    /// Create a pipeline over the given bridge.
    pub fn new(bridge: Arc<dyn BridgeStore>, retry: RetryPolicy) -> Self {
        Self { bridge, retry }
    }

    /// Run one dump to completion.
    ///
    /// Returns the completed manifest. On any failure the in-flight
    /// manifest is flipped to `failed` and written best-effort for
    /// diagnostics; a `complete` manifest is never written unless every
    /// chunk it references landed durably first.
    pub async fn run(
        &self,
        spec: &DumpSpec,
        source: Box<dyn SourceConnector>,
        cancel: CancellationToken,
    ) -> Result<Manifest> {
        let start = Instant::now();
        let mut manifest = Manifest::new(spec.job.as_str(), spec.compression);
        info!("Starting dump run {} for job {}", manifest.id, spec.job);

        match self.execute(spec, &mut manifest, source, &cancel).await {
            Ok(()) => {
                info!(
                    "Dump run {} complete: {} chunks, {} bytes in {:?}",
                    manifest.id,
                    manifest.chunks.len(),
                    manifest.total_bytes,
                    start.elapsed()
                );
                Ok(manifest)
            }
            Err(err) => {
                warn!("Dump run {} failed: {err}", manifest.id);
                manifest.fail();
                self.write_failed_manifest(&manifest).await;
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        spec: &DumpSpec,
        manifest: &mut Manifest,
        mut source: Box<dyn SourceConnector>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        source.open().await?;

        let codec = ChunkCodec::new(spec.compression);
        let (tx, mut rx) = mpsc::channel::<EncodedChunk>(CHUNK_CHANNEL_CAPACITY);

        let producer_token = cancel.child_token();
        let producer = tokio::spawn(produce(
            source,
            codec,
            spec.chunk_size,
            tx,
            producer_token.clone(),
        ));

        // Upload stage: drain the channel in sequence order. Uploads
        // happen here, before the descriptor is appended, so a drained
        // channel plus a clean producer result means every chunk landed.
        let upload_result: Result<()> = async {
            while let Some(chunk) = rx.recv().await {
                let key = keys::chunk_key(&manifest.id, chunk.seq);
                retry_with_policy(&self.retry, "chunk upload", || {
                    let bridge = self.bridge.clone();
                    let key = key.clone();
                    let bytes = chunk.stored.clone();
                    async move { bridge.put(&key, bytes).await }
                })
                .await?;

                debug!(
                    "Uploaded chunk {} ({} bytes stored) for run {}",
                    chunk.seq,
                    chunk.stored_len(),
                    manifest.id
                );

                manifest.push_chunk(ChunkDescriptor {
                    seq: chunk.seq,
                    len: chunk.len,
                    stored_len: chunk.stored_len(),
                    checksum: chunk.checksum,
                    key,
                });
            }
            Ok(())
        }
        .await;

        let (aggregate_checksum, total_bytes) = match upload_result {
            Ok(()) => producer
                .await
                .map_err(|e| Error::stream_interrupted(format!("producer task failed: {e}")))??,
            Err(err) => {
                // Unwind the producer before reporting; it closes the
                // source connector on its way out.
                producer_token.cancel();
                let _ = producer.await;
                return Err(err);
            }
        };

        if total_bytes != manifest.total_bytes {
            return Err(Error::stream_interrupted(format!(
                "read {total_bytes} bytes but descriptors cover {}",
                manifest.total_bytes
            )));
        }

        manifest.complete(aggregate_checksum);

        // The visibility point: one atomic object write, strictly after
        // every chunk upload above.
        let key = keys::manifest_key(&manifest.job, &manifest.id);
        let json = manifest.to_json()?.into_bytes();
        retry_with_policy(&self.retry, "manifest upload", || {
            let bridge = self.bridge.clone();
            let key = key.clone();
            let json = json.clone();
            async move { bridge.put(&key, json).await }
        })
        .await?;

        Ok(())
    }

    async fn write_failed_manifest(&self, manifest: &Manifest) {
        let key = keys::manifest_key(&manifest.job, &manifest.id);
        match manifest.to_json() {
            Ok(json) => {
                if let Err(e) = self.bridge.put(&key, json.into_bytes()).await {
                    warn!("Could not write failed manifest {}: {e}", manifest.id);
                }
            }
            Err(e) => warn!("Could not serialize failed manifest {}: {e}", manifest.id),
        }
    }
}

/// Producer stage: pull chunk-sized slices from the source, encode, and
/// hand off. Owns the source connector and closes it on every exit path.
async fn produce(
    mut source: Box<dyn SourceConnector>,
    codec: ChunkCodec,
    chunk_size: usize,
    tx: mpsc::Sender<EncodedChunk>,
    cancel: CancellationToken,
) -> Result<(String, u64)> {
    let result = pump(source.as_mut(), codec, chunk_size, &tx, &cancel).await;
    let close_result = source.close().await;

    match result {
        Ok(totals) => {
            close_result?;
            Ok(totals)
        }
        Err(err) => Err(err),
    }
}

async fn pump(
    source: &mut dyn SourceConnector,
    codec: ChunkCodec,
    chunk_size: usize,
    tx: &mpsc::Sender<EncodedChunk>,
    cancel: &CancellationToken,
) -> Result<(String, u64)> {
    let mut hasher = StreamHasher::new();
    let mut seq = 0u64;
    let mut buf = vec![0u8; chunk_size];

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Fill at most one chunk; the only full-size buffer in the run.
        let mut filled = 0usize;
        let mut eof = false;
        while filled < chunk_size {
            let n = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                read = source.read(&mut buf[filled..]) => read?,
            };
            if n == 0 {
                eof = true;
                break;
            }
            filled += n;
        }

        if filled > 0 {
            hasher.update(&buf[..filled]);
            let chunk = codec.encode(seq, &buf[..filled])?;
            seq += 1;

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                sent = tx.send(chunk) => {
                    if sent.is_err() {
                        // Upload stage went away; its error wins.
                        return Err(Error::Cancelled);
                    }
                }
            }
        }

        if eof {
            let total = hasher.bytes();
            return Ok((hasher.finalize_hex(), total));
        }
    }
}
