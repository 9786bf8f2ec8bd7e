//! End-to-end dump/restore pipeline tests over an in-memory bridge

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::{
    fast_retry, patterned, CollectingDestination, FailingPutBridge, ScriptedSource,
};
use pontoon_bridge::{keys, BridgeStore, MemoryBridge};
use pontoon_core::types::Compression;
use pontoon_core::Error;
use pontoon_pipeline::{
    select, DumpPipeline, DumpSpec, ManifestStatus, RestorePipeline, RestoreSpec,
};

const MIB: usize = 1024 * 1024;

fn dump_spec(job: &str, chunk_size: usize, compression: Compression) -> DumpSpec {
    DumpSpec {
        job: job.to_string(),
        chunk_size,
        compression,
    }
}

fn restore_spec(job: &str) -> RestoreSpec {
    RestoreSpec {
        job: job.to_string(),
        manifest_id: None,
    }
}

#[tokio::test]
async fn test_round_trip_byte_identity() {
    for compression in [Compression::None, Compression::Gzip] {
        let bridge: Arc<dyn BridgeStore> = Arc::new(MemoryBridge::new());
        let data = patterned(300_000);

        let dump = DumpPipeline::new(bridge.clone(), fast_retry());
        let manifest = dump
            .run(
                &dump_spec("job", 64_000, compression),
                Box::new(ScriptedSource::new(data.clone())),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(manifest.is_complete());
        assert_eq!(manifest.total_bytes, data.len() as u64);

        let restore = RestorePipeline::new(bridge, fast_retry());
        let (dest, probe) = CollectingDestination::new();
        let report = restore
            .run(&restore_spec("job"), Box::new(dest), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.manifest_id, manifest.id);
        assert_eq!(report.bytes_written, data.len() as u64);
        assert_eq!(probe.bytes(), data, "round-trip must be byte-identical");
        assert!(probe.was_closed());
    }
}

#[tokio::test]
async fn test_two_and_a_half_mib_makes_three_chunks() {
    let bridge: Arc<dyn BridgeStore> = Arc::new(MemoryBridge::new());
    let data = patterned(2 * MIB + MIB / 2);

    let dump = DumpPipeline::new(bridge.clone(), fast_retry());
    let manifest = dump
        .run(
            &dump_spec("job", MIB, Compression::None),
            Box::new(ScriptedSource::new(data.clone()).with_read_size(8191)),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let seqs: Vec<u64> = manifest.chunks.iter().map(|c| c.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);

    let lens: Vec<u64> = manifest.chunks.iter().map(|c| c.len).collect();
    assert_eq!(lens, vec![MIB as u64, MIB as u64, (MIB / 2) as u64]);

    // Every chunk object is stored under its deterministic key, and the
    // manifest the bridge serves lists the same contiguous sequence.
    for chunk in &manifest.chunks {
        assert!(bridge.exists(&chunk.key).await.unwrap());
        assert_eq!(chunk.key, keys::chunk_key(&manifest.id, chunk.seq));
    }

    let stored = select::latest_complete(bridge.as_ref(), "job")
        .await
        .unwrap()
        .expect("completed manifest must be selectable");
    assert_eq!(stored.id, manifest.id);
    assert_eq!(stored.chunks.len(), 3);
    stored.validate_chunks().unwrap();
}

#[tokio::test]
async fn test_interrupted_source_never_leaves_complete_manifest() {
    let bridge: Arc<dyn BridgeStore> = Arc::new(MemoryBridge::new());
    let data = patterned(MIB);

    let dump = DumpPipeline::new(bridge.clone(), fast_retry());
    let err = dump
        .run(
            &dump_spec("job", MIB, Compression::None),
            Box::new(ScriptedSource::new(data).failing_after(MIB / 2)),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StreamInterrupted { .. }));

    // The artifact is absent or failed, never complete.
    assert!(select::latest_complete(bridge.as_ref(), "job")
        .await
        .unwrap()
        .is_none());
    for manifest in select::list_manifests(bridge.as_ref(), "job").await.unwrap() {
        assert_eq!(manifest.status, ManifestStatus::Failed);
    }
}

#[tokio::test]
async fn test_upload_failure_fails_run_after_retries() {
    let bridge: Arc<dyn BridgeStore> = Arc::new(FailingPutBridge::new("chunks/"));

    let dump = DumpPipeline::new(bridge.clone(), fast_retry());
    let err = dump
        .run(
            &dump_spec("job", 1024, Compression::None),
            Box::new(ScriptedSource::new(patterned(4096))),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upload { .. }));
    assert!(select::latest_complete(bridge.as_ref(), "job")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_corrupted_chunk_aborts_before_forwarding() {
    let bridge: Arc<dyn BridgeStore> = Arc::new(MemoryBridge::new());
    let data = patterned(2500);

    let dump = DumpPipeline::new(bridge.clone(), fast_retry());
    let manifest = dump
        .run(
            &dump_spec("job", 1000, Compression::None),
            Box::new(ScriptedSource::new(data.clone())),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(manifest.chunks.len(), 3);

    // Flip one byte of the second stored chunk.
    let key = keys::chunk_key(&manifest.id, 1);
    let mut stored = bridge.get(&key).await.unwrap();
    stored[17] ^= 0x40;
    bridge.put(&key, stored).await.unwrap();

    let restore = RestorePipeline::new(bridge, fast_retry());
    let (dest, probe) = CollectingDestination::new();
    let err = restore
        .run(&restore_spec("job"), Box::new(dest), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Integrity { seq, .. } => assert_eq!(seq, 1),
        other => panic!("expected Integrity error, got {other}"),
    }

    // Nothing from the corrupted chunk (or anything after it) reached
    // the destination; at most the verified first chunk did.
    let received = probe.bytes();
    assert!(received.len() <= 1000, "received {} bytes", received.len());
    assert_eq!(received, data[..received.len()]);
    assert!(!probe.was_closed(), "failed restore must not commit");
}

#[tokio::test]
async fn test_destination_write_failure_aborts_run() {
    let bridge: Arc<dyn BridgeStore> = Arc::new(MemoryBridge::new());

    let dump = DumpPipeline::new(bridge.clone(), fast_retry());
    dump.run(
        &dump_spec("job", 1024, Compression::Gzip),
        Box::new(ScriptedSource::new(patterned(10_000))),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let restore = RestorePipeline::new(bridge, fast_retry());
    let (dest, probe) = CollectingDestination::failing();
    let err = restore
        .run(&restore_spec("job"), Box::new(dest), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connection { .. }));
    assert!(!probe.was_closed());
}

#[tokio::test]
async fn test_cancelled_dump_leaves_no_complete_manifest() {
    let bridge: Arc<dyn BridgeStore> = Arc::new(MemoryBridge::new());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let dump = DumpPipeline::new(bridge.clone(), fast_retry());
    let err = dump
        .run(
            &dump_spec("job", 1024, Compression::None),
            Box::new(ScriptedSource::new(patterned(10_000))),
            cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(select::latest_complete(bridge.as_ref(), "job")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_empty_stream_round_trips() {
    let bridge: Arc<dyn BridgeStore> = Arc::new(MemoryBridge::new());

    let dump = DumpPipeline::new(bridge.clone(), fast_retry());
    let manifest = dump
        .run(
            &dump_spec("job", 1024, Compression::Gzip),
            Box::new(ScriptedSource::new(Vec::new())),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(manifest.is_complete());
    assert!(manifest.chunks.is_empty());
    assert_eq!(manifest.total_bytes, 0);

    let restore = RestorePipeline::new(bridge, fast_retry());
    let (dest, probe) = CollectingDestination::new();
    let report = restore
        .run(&restore_spec("job"), Box::new(dest), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.bytes_written, 0);
    assert!(probe.bytes().is_empty());
    assert!(probe.was_closed());
}
