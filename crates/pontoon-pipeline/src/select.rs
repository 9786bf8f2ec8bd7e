//! Manifest selection
//!
//! Restore never sees a `pending` or `failed` manifest: selection lists
//! the job's manifest objects, parses them, and only `complete` ones
//! are eligible. Unparseable objects are skipped with a warning rather
//! than failing the listing, so one corrupt diagnostic record cannot
//! block restores.

use tracing::warn;

use pontoon_bridge::{keys, BridgeStore};
use pontoon_core::{Error, Result};

use crate::manifest::Manifest;

/// All parseable manifests for a job, newest first.
pub async fn list_manifests(bridge: &dyn BridgeStore, job: &str) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();

    for key in bridge.list(&keys::manifest_prefix(job)).await? {
        let bytes = bridge.get(&key).await?;
        match Manifest::from_json(&bytes) {
            Ok(manifest) => manifests.push(manifest),
            Err(e) => warn!("Skipping unparseable manifest object {key}: {e}"),
        }
    }

    manifests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(manifests)
}

/// The most recent `complete` manifest for a job, if any.
pub async fn latest_complete(bridge: &dyn BridgeStore, job: &str) -> Result<Option<Manifest>> {
    Ok(list_manifests(bridge, job)
        .await?
        .into_iter()
        .find(|m| m.is_complete()))
}

/// Load one manifest by id.
pub async fn load(bridge: &dyn BridgeStore, job: &str, manifest_id: &str) -> Result<Manifest> {
    let key = keys::manifest_key(job, manifest_id);
    let bytes = bridge.get(&key).await.map_err(|e| match e {
        Error::NotFound { .. } => Error::no_manifest(job),
        other => other,
    })?;
    Manifest::from_json(&bytes)
}
