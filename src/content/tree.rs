//! Directory snapshot of the content root.
//!
//! The snapshot fixes which records, children and attachments exist for
//! one build pass. Fields are not read here; that happens lazily through
//! the [`Pad`](super::Pad).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rustc_hash::FxHashMap;

use crate::core::{RecordPath, VIRTUAL_MARKER};
use crate::utils::fs::is_temp_name;

/// Primary field file of a record directory.
pub const CONTENTS_FILE: &str = "contents.lr";

const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// One record directory.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub path: RecordPath,
    pub dir: PathBuf,
    /// `contents.lr`, if present
    pub contents: Option<PathBuf>,
    /// `contents+<alt>.lr` files by alt id
    pub alt_contents: BTreeMap<String, PathBuf>,
    /// Child directory names, sorted
    pub children: Vec<String>,
    /// Attachment file names, sorted
    pub attachments: Vec<String>,
}

impl TreeNode {
    fn new(path: RecordPath, dir: PathBuf) -> Self {
        Self {
            path,
            dir,
            contents: None,
            alt_contents: BTreeMap::new(),
            children: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn child_path(&self, name: &str) -> RecordPath {
        self.path.join(name)
    }

    pub fn has_attachment(&self, name: &str) -> bool {
        self.attachments.iter().any(|a| a == name)
    }
}

/// Materialized directory structure of `content/`.
#[derive(Debug, Default)]
pub struct ContentTree {
    root: PathBuf,
    nodes: FxHashMap<RecordPath, TreeNode>,
}

impl ContentTree {
    /// Scan `content_dir`. Hidden entries, editor leftovers and names
    /// containing the virtual marker are ignored.
    pub fn scan(content_dir: &Path) -> Self {
        let mut tree = Self {
            root: content_dir.to_path_buf(),
            nodes: FxHashMap::default(),
        };
        tree.nodes.insert(
            RecordPath::root(),
            TreeNode::new(RecordPath::root(), content_dir.to_path_buf()),
        );

        let entries = WalkDir::new(content_dir)
            .sort(true)
            .skip_hidden(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.depth > 0);

        for entry in entries {
            let path = entry.path();
            let Ok(rel) = path.strip_prefix(content_dir) else {
                continue;
            };
            if rel
                .components()
                .any(|c| c.as_os_str().to_string_lossy().contains(VIRTUAL_MARKER))
            {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let parent = RecordPath::from_relative(rel.parent().unwrap_or(Path::new("")));

            if entry.file_type().is_dir() {
                let record = RecordPath::from_relative(rel);
                tree.nodes
                    .entry(record.clone())
                    .or_insert_with(|| TreeNode::new(record, path.clone()));
                tree.node_entry(&parent).children.push(name);
            } else if entry.file_type().is_file() {
                tree.add_file(&parent, name, path);
            }
        }

        for node in tree.nodes.values_mut() {
            node.children.sort();
            node.attachments.sort();
        }
        tree
    }

    fn add_file(&mut self, parent: &RecordPath, name: String, path: PathBuf) {
        if IGNORED_FILES.contains(&name.as_str()) || is_temp_name(&name) || name.ends_with('~') {
            return;
        }

        let node = self.node_entry(parent);
        if name == CONTENTS_FILE {
            node.contents = Some(path);
        } else if let Some(alt) = alt_of_contents(&name) {
            node.alt_contents.insert(alt.to_string(), path);
        } else {
            node.attachments.push(name);
        }
    }

    fn node_entry(&mut self, path: &RecordPath) -> &mut TreeNode {
        let dir = path.to_fs_path(&self.root);
        self.nodes
            .entry(path.clone())
            .or_insert_with(|| TreeNode::new(path.clone(), dir))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn node(&self, path: &RecordPath) -> Option<&TreeNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &RecordPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Record owning a file or directory below the content root, by location.
    ///
    /// Returns `(as_record, parent)`: the record the path would be if it is
    /// (or was) a directory, and the record directory containing it. Works
    /// for paths that no longer exist.
    pub fn owners_of(&self, path: &Path) -> Option<(RecordPath, RecordPath)> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let as_record = RecordPath::from_relative(rel);
        let parent = as_record.parent().unwrap_or_else(RecordPath::root);
        Some((as_record, parent))
    }
}

/// `contents+de.lr` -> `de`
fn alt_of_contents(name: &str) -> Option<&str> {
    name.strip_prefix("contents+")
        .and_then(|rest| rest.strip_suffix(".lr"))
        .filter(|alt| !alt.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scan_classifies_entries() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "contents.lr", "title: Home");
        write(root, "blog/contents.lr", "title: Blog");
        write(root, "blog/contents+de.lr", "title: Blog DE");
        write(root, "blog/cover.png", "png");
        write(root, "blog/first/contents.lr", "title: First");
        write(root, "blog/.draft/contents.lr", "title: Hidden");
        write(root, "blog/.contents.lr.1.0.tmp", "");
        write(root, "blog/bad@name/contents.lr", "title: x");

        let tree = ContentTree::scan(root);
        let blog = tree.node(&RecordPath::new("/blog")).unwrap();

        assert!(blog.contents.is_some());
        assert_eq!(blog.alt_contents.keys().collect::<Vec<_>>(), ["de"]);
        assert_eq!(blog.attachments, ["cover.png"]);
        assert_eq!(blog.children, ["first"]);
        assert!(tree.contains(&RecordPath::new("/blog/first")));
        assert!(!tree.contains(&RecordPath::new("/blog/.draft")));
        assert_eq!(tree.node(&RecordPath::root()).unwrap().children, ["blog"]);
    }

    #[test]
    fn directory_without_contents_is_a_record() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "empty/photo.jpg", "jpg");

        let tree = ContentTree::scan(dir.path());
        let node = tree.node(&RecordPath::new("/empty")).unwrap();
        assert!(node.contents.is_none());
        assert!(node.has_attachment("photo.jpg"));
    }

    #[test]
    fn owners_of_removed_paths() {
        let tree = ContentTree::scan(Path::new("/nonexistent/content"));
        let (as_record, parent) = tree
            .owners_of(Path::new("/nonexistent/content/blog/post/contents.lr"))
            .unwrap();
        assert_eq!(as_record.as_str(), "/blog/post/contents.lr");
        assert_eq!(parent.as_str(), "/blog/post");
        assert!(tree.owners_of(Path::new("/elsewhere/x")).is_none());
    }
}
