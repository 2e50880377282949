//! Content hashing and the per-indexer hash cache

use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// Stable hex digest of a file's raw bytes.
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Last recorded content hash per relative path.
///
/// Owned by one indexer; two indexers never share entries.
#[derive(Debug, Clone, Default)]
pub struct HashCache {
    hashes: HashMap<String, String>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, relative_path: &str) -> Option<&str> {
        self.hashes.get(relative_path).map(String::as_str)
    }

    /// True when `hash` equals the recorded hash for this exact path.
    pub fn is_current(&self, relative_path: &str, hash: &str) -> bool {
        self.get(relative_path) == Some(hash)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.hashes.contains_key(relative_path)
    }

    pub fn record(&mut self, relative_path: impl Into<String>, hash: impl Into<String>) {
        self.hashes.insert(relative_path.into(), hash.into());
    }

    pub fn forget(&mut self, relative_path: &str) -> Option<String> {
        self.hashes.remove(relative_path)
    }

    /// Drop every entry whose path is not in `keep`.
    pub fn retain_paths(&mut self, keep: &std::collections::HashSet<String>) {
        self.hashes.retain(|path, _| keep.contains(path));
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
