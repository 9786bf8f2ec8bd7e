//! Deterministic object key derivation
//!
//! Chunk keys derive from the manifest id and sequence number, manifest
//! keys from the job name and manifest id, so either side can address
//! any object without a separate index.

/// Key for a chunk object.
pub fn chunk_key(manifest_id: &str, seq: u64) -> String {
    format!("chunks/{manifest_id}/{seq:08}")
}

/// Key for a manifest object.
pub fn manifest_key(job: &str, manifest_id: &str) -> String {
    format!("manifests/{job}/{manifest_id}.json")
}

/// Listing prefix for all manifests of a job.
pub fn manifest_prefix(job: &str) -> String {
    format!("manifests/{job}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_key_zero_padded() {
        assert_eq!(chunk_key("m-1", 0), "chunks/m-1/00000000");
        assert_eq!(chunk_key("m-1", 42), "chunks/m-1/00000042");
    }

    #[test]
    fn test_chunk_keys_sort_in_seq_order() {
        let mut keys: Vec<String> = (0..12).rev().map(|seq| chunk_key("m", seq)).collect();
        keys.sort();
        assert_eq!(keys.first().unwrap(), "chunks/m/00000000");
        assert_eq!(keys.last().unwrap(), "chunks/m/00000011");
    }

    #[test]
    fn test_manifest_key_under_job_prefix() {
        let key = manifest_key("prod-pg", "abc");
        assert!(key.starts_with(&manifest_prefix("prod-pg")));
        assert_eq!(key, "manifests/prod-pg/abc.json");
    }
}
