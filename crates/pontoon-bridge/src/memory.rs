//! In-memory bridge store for tests

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use pontoon_core::{Error, Result};

use crate::BridgeStore;

/// Bridge store holding objects in a process-local map.
///
/// Used by tests and by the `memory` bridge type in configuration;
/// nothing survives process exit.
#[derive(Debug, Default)]
pub struct MemoryBridge {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBridge {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("bridge lock poisoned").len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BridgeStore for MemoryBridge {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects
            .write()
            .expect("bridge lock poisoned")
            .insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .expect("bridge lock poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .expect("bridge lock poisoned")
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .expect("bridge lock poisoned")
            .contains_key(key))
    }
}
