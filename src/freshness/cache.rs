//! Per-pass memo of file hashes.

use dashmap::DashMap;
use std::path::{Path, PathBuf};

use super::{ContentHash, compute_file_hash};

/// File hashes seen by one build pass.
///
/// Sources are treated as read-only for the length of a pass, so each file
/// is read at most once; the next pass opens a new [`Pad`](crate::content::Pad)
/// and with it a new cache. Missing files are not memoized.
#[derive(Debug, Default)]
pub struct HashCache(DashMap<PathBuf, ContentHash>);

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(&self, path: &Path) -> ContentHash {
        if let Some(hit) = self.0.get(path) {
            return *hit;
        }
        let hash = compute_file_hash(path);
        if !hash.is_empty() {
            self.0.insert(path.to_path_buf(), hash);
        }
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_read_wins_for_the_pass() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contents.lr");
        fs::write(&path, "title: A").unwrap();

        let cache = HashCache::new();
        let first = cache.hash(&path);
        fs::write(&path, "title: B").unwrap();
        assert_eq!(cache.hash(&path), first);

        assert_ne!(HashCache::new().hash(&path), first);
    }

    #[test]
    fn missing_files_are_not_memoized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("later.lr");

        let cache = HashCache::new();
        assert!(cache.hash(&path).is_empty());
        fs::write(&path, "x").unwrap();
        assert!(!cache.hash(&path).is_empty());
    }
}
