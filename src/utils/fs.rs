//! Filesystem helpers for outputs and state files.
//!
//! - `atomic_write` - temp file + rename, readers never see partial content
//! - `remove_with_empty_parents` - delete an output and prune empty dirs
//! - `dep_key` / `resolve_dep_key` - stable project-relative path keys

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Suffix of in-flight temp files (always hidden, see [`temp_path_for`]).
pub const TEMP_SUFFIX: &str = ".tmp";

/// Write `data` to `path` atomically.
///
/// Creates parent directories. The content is synced before the rename,
/// so after a crash `path` holds either the old or the new content.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = temp_path_for(path);
    let result = (|| {
        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&temp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

/// Hidden sibling temp path: `dir/.name.<pid>.<n>.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{n}{TEMP_SUFFIX}", std::process::id()))
}

/// Whether a file name belongs to an in-flight (or abandoned) atomic write.
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// Remove `path`, then remove parent directories left empty, stopping at `stop_at`.
///
/// A missing file is not an error.
pub fn remove_with_empty_parents(path: &Path, stop_at: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == stop_at || !current.starts_with(stop_at) {
            break;
        }
        // Fails for non-empty directories, which ends the walk
        if fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}

/// Stable key for a dependency file: `/`-separated and relative to `root`
/// when inside it, absolute otherwise.
pub fn dep_key(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Inverse of [`dep_key`].
pub fn resolve_dep_key(root: &Path, key: &str) -> PathBuf {
    let path = Path::new(key);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let mut resolved = root.to_path_buf();
    resolved.extend(key.split('/').filter(|s| !s.is_empty()));
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/out.html");

        atomic_write(&path, b"one").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"one");

        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");

        // No temp files left behind
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| is_temp_name(&e.file_name().to_string_lossy()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn remove_prunes_empty_dirs_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let lone = root.join("x/y/index.html");
        let kept = root.join("x/keep.txt");
        atomic_write(&lone, b"a").unwrap();
        atomic_write(&kept, b"b").unwrap();

        remove_with_empty_parents(&lone, root).unwrap();

        assert!(!root.join("x/y").exists());
        assert!(kept.exists());
        assert!(root.exists());

        // Missing file is fine
        remove_with_empty_parents(&lone, root).unwrap();
    }

    #[test]
    fn dep_key_roundtrip() {
        let root = Path::new("/project");
        let file = Path::new("/project/content/blog/contents.lr");
        let key = dep_key(root, file);
        assert_eq!(key, "content/blog/contents.lr");
        assert_eq!(resolve_dep_key(root, &key), file);

        let outside = Path::new("/elsewhere/t.html");
        assert_eq!(dep_key(root, outside), "/elsewhere/t.html");
        assert_eq!(resolve_dep_key(root, "/elsewhere/t.html"), outside);
    }
}
