//! Filesystem bridge store
//!
//! Stores objects as files under a root directory, mirroring bridge
//! keys as relative paths. Atomic visibility is manufactured with a
//! same-directory tempfile and rename, so `get` never observes a
//! half-written object.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use pontoon_core::{Error, Result};

use crate::BridgeStore;

/// Bridge store backed by a local directory, mainly for development
/// and tests.
#[derive(Debug)]
pub struct FsBridge {
    root: Utf8PathBuf,
}

impl FsBridge {
    /// Create the bridge, creating the root directory if needed.
    pub fn new(root: Utf8PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory objects live under.
    pub fn root(&self) -> &Utf8PathBuf {
        &self.root
    }

    fn object_path(&self, key: &str) -> Utf8PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BridgeStore for FsBridge {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.object_path(key);
        let parent = path
            .parent()
            .ok_or_else(|| Error::upload(key, "key has no parent directory"))?;

        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::upload(key, e.to_string()))?;

        // Write into a tempfile in the target directory, then rename.
        // The rename is what makes the object visible, all at once.
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| Error::upload(key, e.to_string()))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| Error::upload(key, e.to_string()))?;
        tmp.persist(&path)
            .map_err(|e| Error::upload(key, e.to_string()))?;

        debug!("Stored {} bytes at {}", bytes.len(), path);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(key);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(key)
            } else {
                Error::download(key, e.to_string())
            }
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();

        let mut keys = Vec::new();
        for entry in WalkDir::new(root.as_std_path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Ok(relative) = entry.path().strip_prefix(root.as_std_path()) else {
                continue;
            };
            let key = relative.to_string_lossy().replace('\\', "/");
            if key.starts_with(&prefix) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match tokio::fs::metadata(self.object_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::download(key, e.to_string())),
        }
    }
}
