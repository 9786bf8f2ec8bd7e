//! Shared test doubles for pipeline tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pontoon_bridge::{BridgeStore, MemoryBridge};
use pontoon_connectors::{DestinationConnector, SourceConnector};
use pontoon_core::types::{RetryPolicy, RetryStrategy};
use pontoon_core::{Error, Result};

/// Retry policy with no sleeping, for fast failure tests.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        strategy: RetryStrategy::None,
        backoff_multiplier: 1.0,
        initial_delay_ms: 0,
        max_delay_ms: 0,
    }
}

/// Deterministic patterned payload of the given length.
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

/// In-memory source that serves a fixed byte sequence in small reads,
/// optionally dying mid-stream after a byte offset.
pub struct ScriptedSource {
    data: Vec<u8>,
    pos: usize,
    read_size: usize,
    fail_after: Option<usize>,
    opened: bool,
}

impl ScriptedSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            read_size: 8 * 1024,
            fail_after: None,
            opened: false,
        }
    }

    /// Cap how many bytes a single read call returns.
    pub fn with_read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size;
        self
    }

    /// Die with `StreamInterrupted` once `offset` bytes were served.
    pub fn failing_after(mut self, offset: usize) -> Self {
        self.fail_after = Some(offset);
        self
    }
}

#[async_trait]
impl SourceConnector for ScriptedSource {
    async fn open(&mut self) -> Result<()> {
        self.opened = true;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        assert!(self.opened, "read before open");

        if let Some(limit) = self.fail_after {
            if self.pos >= limit {
                return Err(Error::stream_interrupted("source disconnected mid-dump"));
            }
            let end = limit.min(self.data.len());
            let n = self.read_size.min(buf.len()).min(end - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }

        if self.pos >= self.data.len() {
            return Ok(0);
        }
        let n = self.read_size.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Destination that records everything it is fed.
pub struct CollectingDestination {
    received: Arc<Mutex<Vec<u8>>>,
    opened: Arc<Mutex<bool>>,
    closed: Arc<Mutex<bool>>,
    fail_writes: bool,
}

/// Observable state of a [`CollectingDestination`].
#[derive(Clone)]
pub struct DestinationProbe {
    pub received: Arc<Mutex<Vec<u8>>>,
    pub opened: Arc<Mutex<bool>>,
    pub closed: Arc<Mutex<bool>>,
}

impl DestinationProbe {
    pub fn bytes(&self) -> Vec<u8> {
        self.received.lock().unwrap().clone()
    }

    pub fn was_opened(&self) -> bool {
        *self.opened.lock().unwrap()
    }

    pub fn was_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

impl CollectingDestination {
    pub fn new() -> (Self, DestinationProbe) {
        let dest = Self {
            received: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(Mutex::new(false)),
            closed: Arc::new(Mutex::new(false)),
            fail_writes: false,
        };
        let probe = DestinationProbe {
            received: dest.received.clone(),
            opened: dest.opened.clone(),
            closed: dest.closed.clone(),
        };
        (dest, probe)
    }

    pub fn failing() -> (Self, DestinationProbe) {
        let (mut dest, probe) = Self::new();
        dest.fail_writes = true;
        (dest, probe)
    }
}

#[async_trait]
impl DestinationConnector for CollectingDestination {
    async fn open(&mut self) -> Result<()> {
        *self.opened.lock().unwrap() = true;
        Ok(())
    }

    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::connection("test-destination", "write refused"));
        }
        self.received.lock().unwrap().extend_from_slice(buf);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// Bridge wrapper that refuses puts under a key prefix.
pub struct FailingPutBridge {
    inner: MemoryBridge,
    fail_prefix: String,
}

impl FailingPutBridge {
    pub fn new(fail_prefix: impl Into<String>) -> Self {
        Self {
            inner: MemoryBridge::new(),
            fail_prefix: fail_prefix.into(),
        }
    }
}

#[async_trait]
impl BridgeStore for FailingPutBridge {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        if key.starts_with(&self.fail_prefix) {
            return Err(Error::upload(key, "injected upload failure"));
        }
        self.inner.put(key, bytes).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }
}
